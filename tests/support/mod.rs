#![allow(dead_code)]

pub mod engine;
pub mod scheduler;
pub mod temp_db;

/// Let spawned tasks run until they block again.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
