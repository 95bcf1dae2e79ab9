//! 两槽位分配器：决策互斥，占用状态以文件系统为事实来源。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{SLOT_A_FILENAME, SLOT_B_FILENAME};
use crate::storage::Storage;

/// 两个固定的逻辑槽位，各绑定一个规范文件名。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn canonical_filename(self) -> &'static str {
        match self {
            Slot::A => SLOT_A_FILENAME,
            Slot::B => SLOT_B_FILENAME,
        }
    }
}

#[derive(Debug)]
pub enum AllocError {
    Capacity,
    Io(std::io::Error),
}

impl From<std::io::Error> for AllocError {
    fn from(err: std::io::Error) -> Self {
        AllocError::Io(err)
    }
}

/// 槽位分配器。分配决策在互斥锁内完成，占用状态每次从磁盘重读。
#[derive(Debug)]
pub struct SlotAllocator {
    storage: Arc<Storage>,
    guard: Mutex<()>,
}

impl SlotAllocator {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            guard: Mutex::new(()),
        }
    }

    /// 将临时文件重命名到下一个空闲槽位；两槽位均占用时删除临时文件并返回容量错误。
    pub async fn allocate(&self, temp_path: &Path) -> Result<(Slot, PathBuf), AllocError> {
        let _guard = self.guard.lock().await;

        let slot = match self.next_free_slot().await? {
            Some(slot) => slot,
            None => {
                if let Err(err) = fs::remove_file(temp_path).await {
                    warn!(path = ?temp_path, error = %err, "failed to remove rejected temp file");
                }
                return Err(AllocError::Capacity);
            }
        };

        let target = self.storage.slot_path(slot.canonical_filename());
        fs::rename(temp_path, &target).await?;
        info!(slot = ?slot, target = ?target, "slot allocated");
        Ok((slot, target))
    }

    async fn next_free_slot(&self) -> Result<Option<Slot>, AllocError> {
        if !self.storage.slot_occupied(SLOT_A_FILENAME).await? {
            return Ok(Some(Slot::A));
        }
        if !self.storage.slot_occupied(SLOT_B_FILENAME).await? {
            return Ok(Some(Slot::B));
        }
        Ok(None)
    }
}
