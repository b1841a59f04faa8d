//! AES block cipher with a portable and a hardware-accelerated implementation.

mod accelerated;
mod cbc;
pub mod portable;

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::*;

pub use self::accelerated::AcceleratedAes;
pub use self::portable::PortableAes;

pub const BLOCK_SIZE: usize = 16;

/// AES implementation choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AesStrategy {
    /// Table-driven implementation, available everywhere.
    Portable,
    /// CPU AES instructions.
    Accelerated,
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn cpu_has_aes() -> bool {
    std::is_x86_feature_detected!("aes")
}

#[cfg(target_arch = "aarch64")]
fn cpu_has_aes() -> bool {
    std::arch::is_aarch64_feature_detected!("aes")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn cpu_has_aes() -> bool {
    false
}

impl AesStrategy {
    /// Best strategy for this CPU. The probe runs once per process.
    pub fn selected() -> AesStrategy {
        static SELECTED: OnceLock<AesStrategy> = OnceLock::new();
        *SELECTED.get_or_init(|| {
            let strategy = if cpu_has_aes() {
                AesStrategy::Accelerated
            } else {
                AesStrategy::Portable
            };
            tracing::debug!(?strategy, "selected AES implementation");
            strategy
        })
    }
}

enum Engine {
    Portable(PortableAes),
    Accelerated(AcceleratedAes),
}

/// AES-128/192/256 on single blocks, plus CBC mode with PKCS#7 padding.
pub struct AesBlockCipher {
    engine: Engine,
}

impl std::fmt::Debug for AesBlockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesBlockCipher")
            .field("strategy", &self.strategy())
            .field("key_size", &self.key_size())
            .finish_non_exhaustive()
    }
}

impl AesBlockCipher {
    /// Create a cipher using the strategy selected for this CPU.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        Self::with_strategy(key, AesStrategy::selected())
    }

    pub fn with_strategy(key: &[u8], strategy: AesStrategy) -> Result<Self, Error> {
        let engine = match strategy {
            AesStrategy::Portable => Engine::Portable(PortableAes::new(key)?),
            AesStrategy::Accelerated => Engine::Accelerated(AcceleratedAes::new(key)?),
        };
        Ok(AesBlockCipher { engine })
    }

    pub fn strategy(&self) -> AesStrategy {
        match self.engine {
            Engine::Portable(_) => AesStrategy::Portable,
            Engine::Accelerated(_) => AesStrategy::Accelerated,
        }
    }

    /// Key size in bytes.
    pub fn key_size(&self) -> usize {
        match &self.engine {
            Engine::Portable(aes) => aes.key_size(),
            Engine::Accelerated(aes) => aes.key_size(),
        }
    }

    pub fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        match &self.engine {
            Engine::Portable(aes) => aes.encrypt_block(block),
            Engine::Accelerated(aes) => aes.encrypt_block(block),
        }
    }

    pub fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        match &self.engine {
            Engine::Portable(aes) => aes.decrypt_block(block),
            Engine::Accelerated(aes) => aes.decrypt_block(block),
        }
    }
}
