//! GestureCatalogue - Config Loader 输出
//!
//! 可用手势定义列表，在开始同步前加载一次。

use serde::{Deserialize, Serialize};

use crate::{Gesture, GestureKind};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 手势目录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureCatalogue {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 手势定义
    #[serde(default)]
    pub gestures: Vec<Gesture>,
}

impl GestureCatalogue {
    pub fn new(gestures: Vec<Gesture>) -> Self {
        Self {
            version: ConfigVersion::V1,
            gestures,
        }
    }

    /// 按类型过滤，保持目录顺序
    pub fn of_kind(&self, kind: GestureKind) -> Vec<Gesture> {
        self.gestures
            .iter()
            .filter(|g| g.kind == kind)
            .cloned()
            .collect()
    }

    /// 按名称查找
    pub fn find(&self, name: &str) -> Option<&Gesture> {
        self.gestures.iter().find(|g| &*g.name == name)
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }
}
