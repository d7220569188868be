//! 领域层
//!
//! 聚合、参考数据与仓储接口

pub mod api_resource;
pub mod catalog;
pub mod client;
pub mod identity_resource;
pub mod log;
pub mod persisted_grant;

use ids_common::{EntityId, NEW_ID};

/// 子集合条目：拥有自身标识和指向根的外键
pub trait ChildEntry {
    fn set_id(&mut self, id: EntityId);
    fn set_owner_id(&mut self, owner: EntityId);
}

/// 为子集合条目实现 [`ChildEntry`]，第二个参数为外键字段
#[macro_export]
macro_rules! child_entry {
    ($ty:ty, $owner:ident) => {
        impl $crate::domain::ChildEntry for $ty {
            fn set_id(&mut self, id: ::ids_common::EntityId) {
                self.id = id;
            }

            fn set_owner_id(&mut self, owner: ::ids_common::EntityId) {
                self.$owner = owner;
            }
        }
    };
}

/// 清空条目标识与外键
pub fn reset_ids<T: ChildEntry>(items: &mut [T]) {
    for item in items {
        item.set_id(NEW_ID);
        item.set_owner_id(NEW_ID);
    }
}

/// 写入外键
pub fn stamp_owner<T: ChildEntry>(items: &mut [T], owner: EntityId) {
    for item in items {
        item.set_owner_id(owner);
    }
}
