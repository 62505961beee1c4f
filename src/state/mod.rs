mod keyring_storage;
mod session_store;
mod storage;

pub use keyring_storage::{KeyringStorage, KEYRING_SERVICE};
pub use session_store::{Rotation, SessionStore, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER};
pub use storage::{FileStorage, MemoryStorage, Storage};
