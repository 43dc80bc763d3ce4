pub const FLASH_SALE_TABLE: &str = "fs-flash-sale";
pub const SALE_ITEM_TABLE: &str = "fs-sale-item";
pub const VIEW_EVENT_TABLE: &str = "fs-view-event";
pub const PURCHASE_EVENT_TABLE: &str = "fs-purchase-event";
pub const ANALYTICS_TABLE: &str = "fs-analytics";

/// JWT audience expected on tokens from the external auth service.
pub const JWT_AUDIENCE: &str = "flash-sale-rs";

/// Region used when AWS_REGION is not set.
pub const DEFAULT_REGION: &str = "us-east-1";
/// DynamoDB Local endpoint used by the test constructor.
pub const TEST_STORE_ENDPOINT: &str = "http://localhost:8000";

pub const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;
pub const WEEK_MILLIS: u64 = 7 * DAY_MILLIS;

/// DynamoDB caps a single TransactWriteItems call at 100 actions.
pub const MAX_TRANSACT_ITEMS: usize = 100;

pub const DEFAULT_PAGE_SIZE: i32 = 20;
pub const MAX_PAGE_SIZE: i32 = 100;
