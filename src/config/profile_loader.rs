// ==========================================
// Maestro SKU 整合工具 - 配置加载器
// ==========================================
// 职责: 从 JSON 文件加载整合配置、校验、提供默认路径
// 存储: 用户配置目录下 maestro-sku-builder/profile.json
// ==========================================

use crate::config::profile::ConsolidationProfile;
use crate::domain::mapping::{FieldSource, ValueTransform};
use crate::importer::error::{ConsolidationError, ConsolidationResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 配置目录名
const PROFILE_DIR: &str = "maestro-sku-builder";

/// 配置文件名
const PROFILE_FILE: &str = "profile.json";

/// 默认配置文件路径
///
/// # 返回
/// - Some(PathBuf): <用户配置目录>/maestro-sku-builder/profile.json
/// - None: 无法确定用户配置目录
pub fn default_profile_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(PROFILE_DIR).join(PROFILE_FILE))
}

/// 从 JSON 文件加载配置（并校验）
pub fn load_profile(path: &Path) -> ConsolidationResult<ConsolidationProfile> {
    let path_str = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| ConsolidationError::ProfileError {
        path: path_str.clone(),
        reason: e.to_string(),
    })?;

    let profile: ConsolidationProfile =
        serde_json::from_str(&raw).map_err(|e| ConsolidationError::ProfileError {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

    validate_profile(&profile).map_err(|reason| ConsolidationError::ProfileError {
        path: path_str.clone(),
        reason,
    })?;

    info!(path = %path_str, profile = %profile.name, mappings = profile.mappings.len(), "配置加载完成");
    Ok(profile)
}

/// 加载配置：显式路径 > 默认路径（存在时）> 内置配置
pub fn load_or_default(explicit: Option<&Path>) -> ConsolidationResult<ConsolidationProfile> {
    if let Some(path) = explicit {
        return load_profile(path);
    }

    match default_profile_path() {
        Some(path) if path.exists() => load_profile(&path),
        _ => {
            debug!("未找到配置文件，使用内置配置");
            Ok(ConsolidationProfile::default())
        }
    }
}

/// 校验配置
///
/// # 规则
/// - 至少一条映射，目标列名唯一且不与 SKU 输出列重名
/// - 查找映射的角色链非空，且每个角色均已配置
/// - 缩放因子为有限数
/// - 角色配置不重复
pub fn validate_profile(profile: &ConsolidationProfile) -> Result<(), String> {
    if profile.mappings.is_empty() {
        return Err("映射规则为空".to_string());
    }

    let mut seen_roles = HashSet::new();
    for role in &profile.roles {
        if !seen_roles.insert(role.role) {
            return Err(format!("角色 {} 重复配置", role.role));
        }
    }

    let mut destinations = HashSet::new();
    destinations.insert(profile.identifier.output_name.as_str());
    for mapping in &profile.mappings {
        if !destinations.insert(mapping.destination.as_str()) {
            return Err(format!("输出列 {} 重复", mapping.destination));
        }

        if let FieldSource::Lookup {
            roles, transform, ..
        } = &mapping.source
        {
            if roles.is_empty() {
                return Err(format!("输出列 {} 未指定角色", mapping.destination));
            }
            if let Some(role) = roles.iter().find(|r| profile.role(**r).is_none()) {
                return Err(format!(
                    "输出列 {} 引用了未配置的角色 {}",
                    mapping.destination, role
                ));
            }
            if let Some(ValueTransform::Scale { factor }) = transform {
                if !factor.is_finite() {
                    return Err(format!("输出列 {} 的缩放因子无效", mapping.destination));
                }
            }
        }
    }

    Ok(())
}
