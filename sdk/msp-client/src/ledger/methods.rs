//! JSON-RPC method names exposed by the ledger node.

/// Storage request record for a file key, if any.
pub const STORAGE_REQUEST: &str = "storagehubclient_storageRequest";

/// Bucket record by bucket ID.
pub const BUCKET: &str = "storagehubclient_bucket";

/// Dynamic-rate payment stream between a BSP and a user.
pub const DYNAMIC_RATE_STREAM: &str = "storagehubclient_dynamicRatePaymentStream";

/// Fixed-rate payment stream between an MSP and a user.
pub const FIXED_RATE_STREAM: &str = "storagehubclient_fixedRatePaymentStream";

/// Last chargeable tick and price index published by a provider.
pub const LAST_CHARGEABLE_INFO: &str = "storagehubclient_lastChargeableInfo";

/// Number of file deletions queued for a user.
pub const PENDING_DELETION_COUNT: &str = "storagehubclient_pendingFileDeletionCount";

/// Current tick of the ledger clock.
pub const CURRENT_TICK: &str = "storagehubclient_currentTick";

/// Free balance of an account.
pub const FREE_BALANCE: &str = "storagehubclient_freeBalance";

/// Whether a user is flagged as out of funds.
pub const IS_INSOLVENT: &str = "storagehubclient_isUserInsolvent";

/// Submit a signed call and watch it to inclusion; returns a receipt.
pub const SUBMIT_CALL: &str = "storagehubclient_submitAndWatch";
