// ==========================================
// Maestro SKU 整合工具 - 数据源分类器实现
// ==========================================
// 阶段 3: 文件名 → 数据源角色
// 规则: 小写文件名子串匹配，按配置顺序第一个命中的角色生效
// 红线: 不做模糊匹配，未命中即上报
// ==========================================

use crate::config::{ConsolidationProfile, FilenameRule};
use crate::domain::types::SourceRole;
use crate::importer::consolidation_trait::{Classification, SourceClassifier};

pub struct FilenameClassifier {
    rules: Vec<(SourceRole, FilenameRule)>,
}

impl FilenameClassifier {
    pub fn new(rules: Vec<(SourceRole, FilenameRule)>) -> Self {
        Self { rules }
    }

    /// 按配置中的角色顺序构造
    pub fn from_profile(profile: &ConsolidationProfile) -> Self {
        Self::new(
            profile
                .roles
                .iter()
                .map(|r| (r.role, r.filename.clone()))
                .collect(),
        )
    }
}

impl SourceClassifier for FilenameClassifier {
    fn classify(&self, file_name: &str) -> Classification {
        let lowercase = file_name.to_lowercase();
        let mut matched = self
            .rules
            .iter()
            .filter(|(_, rule)| rule.matches(&lowercase))
            .map(|(role, _)| *role);

        let role = matched.next();
        let also_matched = matched.collect();

        Classification {
            file_name: file_name.to_string(),
            role,
            also_matched,
        }
    }
}
