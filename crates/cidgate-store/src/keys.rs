//! Fixed key names and namespace prefixes.
//!
//! | Key | Value |
//! |-----|-------|
//! | `gateway:preferred` | [`PreferredGateway`](crate::PreferredGateway) JSON |
//! | `blob:{cid}` | raw blob bytes |
//! | `status:{cid}` | [`StatusEntry`](crate::StatusEntry) JSON |
//! | `speed:{cid}` | `GatewayHealth` JSON for probes against `cid` |
//! | `cache:index` | `{cid: {size, timestamp}}` JSON |
//! | `cache:size` | running total, decimal string |

use cidgate_core::Cid;

pub const PREFERRED_GATEWAY: &str = "gateway:preferred";
pub const CACHE_INDEX: &str = "cache:index";
pub const CACHE_SIZE: &str = "cache:size";

pub const BLOB_PREFIX: &str = "blob:";
pub const STATUS_PREFIX: &str = "status:";
pub const SPEED_PREFIX: &str = "speed:";

pub fn blob(cid: &Cid) -> String {
    format!("{BLOB_PREFIX}{cid}")
}

pub fn status(cid: &Cid) -> String {
    format!("{STATUS_PREFIX}{cid}")
}

pub fn speed(cid: &Cid) -> String {
    format!("{SPEED_PREFIX}{cid}")
}
