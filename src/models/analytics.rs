use core::fmt;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

/// Coarse device class reported by the storefront client.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
}

impl Device {
    /// Attribute bumped by the lazy per-view analytics increment.
    pub fn views_attr(&self) -> &'static str {
        match *self {
            Device::Desktop => "desktopViews",
            Device::Mobile => "mobileViews",
            Device::Tablet => "tabletViews",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let out = match *self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
        };
        write!(f, "{}", out)
    }
}

/// Immutable view event, appended by storefront traffic.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    /// Owning sale's Ulid, hash key
    pub flash_sale_id: Ulid,
    /// Ulid, range key; its timestamp part orders events
    pub id: Ulid,
    /// Viewed item's Ulid
    pub flash_sale_item_id: Ulid,
    /// Authenticated user, when known
    pub user_id: Option<String>,
    /// Anonymous session, when supplied
    pub session_id: Option<String>,
    /// Client IP, from x-forwarded-for
    pub ip: Option<String>,
    /// Client user agent header
    pub user_agent: Option<String>,
    /// Device class, client-reported
    pub device: Option<Device>,
    /// Client-supplied timestamp, unix millis
    pub created_at: u64,
}

/// Immutable purchase event. Records the event only; it does not touch the
/// item's remainingQuantity (stock decrement is unresolved, see DESIGN.md).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    /// Owning sale's Ulid, hash key
    pub flash_sale_id: Ulid,
    /// Ulid, range key
    pub id: Ulid,
    /// Purchased item's Ulid
    pub flash_sale_item_id: Ulid,
    /// Authenticated user, when known
    pub user_id: Option<String>,
    /// Anonymous session, when supplied
    pub session_id: Option<String>,
    /// Units bought
    pub quantity: u32,
    /// Total paid for the line
    pub total_price: u64,
    /// Client-supplied timestamp, unix millis
    pub created_at: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackViewRequest {
    pub flash_sale_id: Ulid,
    pub flash_sale_item_id: Ulid,
    pub session_id: Option<String>,
    pub device: Option<Device>,
    /// Client clock, unix millis; server time is used when absent
    pub timestamp: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackPurchaseRequest {
    pub flash_sale_id: Ulid,
    pub flash_sale_item_id: Ulid,
    pub session_id: Option<String>,
    pub quantity: u32,
    pub total_price: u64,
    /// Client clock, unix millis; server time is used when absent
    pub timestamp: Option<u64>,
}

/// Counters for one time window.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowMetrics {
    pub views: u64,
    pub purchases: u64,
    pub revenue: u64,
    pub conversion_rate: f64,
}

impl WindowMetrics {
    pub fn from_events(views: &[ViewEvent], purchases: &[PurchaseEvent]) -> Self {
        let view_count = views.len() as u64;
        let purchase_count = purchases.len() as u64;
        Self {
            views: view_count,
            purchases: purchase_count,
            revenue: purchases.iter().map(|p| p.total_price).sum(),
            conversion_rate: conversion_rate(purchase_count, view_count),
        }
    }
}

/// Denormalized per-sale counters. Incremented lazily on each tracked view
/// and purchase; allowed to drift, resynchronized by the recompute endpoint.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleAnalytics {
    /// Owning sale's Ulid, hash key
    pub flash_sale_id: Ulid,
    pub total_views: u64,
    pub total_purchases: u64,
    pub total_revenue: u64,
    /// Distinct non-null userId among view events
    pub unique_visitors: u64,
    /// purchases / views * 100, rounded to 2 decimals
    pub conversion_rate: f64,
    pub desktop_views: u64,
    pub mobile_views: u64,
    pub tablet_views: u64,
    /// Last 24 hours
    pub today: WindowMetrics,
    /// Last 7 days
    pub this_week: WindowMetrics,
    /// Recompute time, unix millis
    pub updated_at: u64,
}

impl FlashSaleAnalytics {
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        flash_sale_id: Ulid,
        all_views: &[ViewEvent],
        all_purchases: &[PurchaseEvent],
        day_views: &[ViewEvent],
        day_purchases: &[PurchaseEvent],
        week_views: &[ViewEvent],
        week_purchases: &[PurchaseEvent],
        now: u64,
    ) -> Self {
        let total = WindowMetrics::from_events(all_views, all_purchases);
        let visitors: HashSet<&str> = all_views
            .iter()
            .filter_map(|v| v.user_id.as_deref())
            .collect();

        let mut device_views = [0u64; 3];
        for view in all_views {
            match view.device {
                Some(Device::Desktop) => device_views[0] += 1,
                Some(Device::Mobile) => device_views[1] += 1,
                Some(Device::Tablet) => device_views[2] += 1,
                None => {}
            }
        }

        Self {
            flash_sale_id,
            total_views: total.views,
            total_purchases: total.purchases,
            total_revenue: total.revenue,
            unique_visitors: visitors.len() as u64,
            conversion_rate: total.conversion_rate,
            desktop_views: device_views[0],
            mobile_views: device_views[1],
            tablet_views: device_views[2],
            today: WindowMetrics::from_events(day_views, day_purchases),
            this_week: WindowMetrics::from_events(week_views, week_purchases),
            updated_at: now,
        }
    }
}

/// purchases / views * 100 rounded to 2 decimals; 0 when there are no views.
pub fn conversion_rate(purchases: u64, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    round2(purchases as f64 / views as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
