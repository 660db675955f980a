//! 从配置构建 queue disc 树
//!
//! `QdiscSpec` 是配置文件里的写法；`build_queue_disc` 把它映射到具体类型并完成校验。

use serde::{Deserialize, Serialize};

use super::core::QueueDisc;
use super::error::ConfigError;
use super::fifo::FifoQueueDisc;
use super::prio::PrioQueueDisc;
use crate::queue::QueueSize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QdiscSpec {
    Fifo {
        /// 例如 `"1000p"` 或 `"65535000B"`；缺省为 1000 个包
        #[serde(default)]
        limit: Option<QueueSize>,
    },
    Prio {
        /// 按 band 顺序排列的子 queue disc；为空时使用两个默认 Fifo
        #[serde(default)]
        bands: Vec<QdiscSpec>,
        /// 16 项 priority → band 映射；缺省使用 pfifo_fast 的映射
        #[serde(default)]
        priomap: Option<Vec<u16>>,
    },
}

impl QdiscSpec {
    /// `n_bands` 个 band，每个 band 是上限为 `limit` 的 Fifo
    pub fn prio_with_fifo_bands(n_bands: usize, limit: QueueSize) -> Self {
        QdiscSpec::Prio {
            bands: vec![QdiscSpec::Fifo { limit: Some(limit) }; n_bands],
            priomap: None,
        }
    }
}

impl Default for QdiscSpec {
    fn default() -> Self {
        QdiscSpec::Prio {
            bands: vec![QdiscSpec::Fifo { limit: None }; 2],
            priomap: None,
        }
    }
}

/// 只构建、不校验（子节点同样未校验）
pub fn create_queue_disc(spec: &QdiscSpec) -> Result<Box<dyn QueueDisc>, ConfigError> {
    match spec {
        QdiscSpec::Fifo { limit } => {
            let fifo = match limit {
                Some(limit) => FifoQueueDisc::with_limit(*limit),
                None => FifoQueueDisc::new(),
            };
            Ok(Box::new(fifo))
        }
        QdiscSpec::Prio { bands, priomap } => {
            let mut prio = PrioQueueDisc::new();
            if let Some(map) = priomap {
                if map.len() != 16 {
                    return Err(ConfigError::PriomapLength { found: map.len() });
                }
                for (prio_value, band) in (0u8..).zip(map.iter()) {
                    prio.set_band_for_priority(prio_value, *band);
                }
            }
            for (index, band) in bands.iter().enumerate() {
                let child = create_queue_disc(band).map_err(|source| ConfigError::Class {
                    index,
                    source: Box::new(source),
                })?;
                prio.base_mut().add_class(child);
            }
            Ok(Box::new(prio))
        }
    }
}

/// 构建并校验整棵树，返回可直接使用的根节点
pub fn build_queue_disc(spec: &QdiscSpec) -> Result<Box<dyn QueueDisc>, ConfigError> {
    let mut root = create_queue_disc(spec)?;
    root.initialize()?;
    Ok(root)
}
