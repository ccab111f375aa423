//! Per-token serialization within a process.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

use crate::domain::TokenAddress;

const DEFAULT_STRIPES: usize = 256;

/// Fixed pool of async mutexes, selected by address hash.
///
/// Two calls for the same token always contend on the same stripe. Calls for
/// different tokens may share a stripe, which only costs throughput.
pub(crate) struct StripedLocks {
    stripes: Vec<Mutex<()>>,
}

impl StripedLocks {
    pub(crate) fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
        }
    }

    pub(crate) async fn lock(&self, address: &TokenAddress) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        // Truncation is fine, only the low bits pick the stripe.
        #[allow(clippy::cast_possible_truncation)]
        let index = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[index].lock().await
    }
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn same_address_is_serialized() {
        let locks = Arc::new(StripedLocks::new(4));
        let address = TokenAddress::new("tok");
        let guard = locks.lock(&address).await;

        let contender = {
            let locks = Arc::clone(&locks);
            let address = address.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&address).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }
}
