//! Protocol and pool constants with the defaults from the environment table.

/// Number of data centers the remote message network exposes (1..=5).
pub const DC_COUNT: u8 = 5;

/// Default number of senders a [`crate`]-wide `DCConnectionManager` may open
/// per DC before reuse becomes mandatory. Recommended not to exceed 25 to
/// avoid pathological disconnect/reconnect loops under burst load.
pub const DEFAULT_CONNECTION_LIMIT: usize = 20;

/// Hard ceiling on `CONNECTION_LIMIT`; configuring above this is almost
/// certainly a misconfiguration rather than an intentional burst policy.
pub const RECOMMENDED_CONNECTION_LIMIT_CEILING: usize = 25;

/// Default aligned chunk size used by `GetFile`, in bytes (1 MiB).
pub const DEFAULT_DOWNLOAD_PART_SIZE: u32 = 1024 * 1024;

/// Default capacity of the file-info LRU cache.
pub const DEFAULT_CACHE_SIZE: usize = 128;

/// Default HTTP bind address when `HOST`/`PORT` are unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP bind port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;
