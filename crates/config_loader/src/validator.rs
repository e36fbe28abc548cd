//! 配置校验模块
//!
//! 校验规则：
//! - 手势名称非空且唯一
//! - slot_count > 0
//! - output_capacity > 0

use std::collections::HashSet;

use contracts::{ContractError, EngineConfig, GestureCatalogue};

/// 校验手势目录
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate_catalogue(catalogue: &GestureCatalogue) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, gesture) in catalogue.gestures.iter().enumerate() {
        if gesture.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("gestures[{idx}].name"),
                "gesture name cannot be empty",
            ));
        }
        if !seen.insert(&*gesture.name) {
            return Err(ContractError::config_validation(
                format!("gestures[name={}]", gesture.name),
                "duplicate gesture name",
            ));
        }
    }
    Ok(())
}

/// 校验引擎配置
pub fn validate_engine_config(config: &EngineConfig) -> Result<(), ContractError> {
    if config.slot_count == 0 {
        return Err(ContractError::config_validation(
            "slot_count",
            "slot_count must be > 0",
        ));
    }
    if config.output_capacity == 0 {
        return Err(ContractError::config_validation(
            "output_capacity",
            "output_capacity must be > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Gesture;

    #[test]
    fn test_valid_catalogue() {
        let catalogue = GestureCatalogue::new(vec![
            Gesture::discrete("wave"),
            Gesture::continuous("lift"),
        ]);
        assert!(validate_catalogue(&catalogue).is_ok());
    }

    #[test]
    fn test_duplicate_gesture_name() {
        let catalogue = GestureCatalogue::new(vec![
            Gesture::discrete("wave"),
            Gesture::continuous("wave"),
        ]);
        let err = validate_catalogue(&catalogue).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_gesture_name() {
        let catalogue = GestureCatalogue::new(vec![Gesture::discrete("  ")]);
        let err = validate_catalogue(&catalogue).unwrap_err();
        assert!(err.to_string().contains("gestures[0].name"));
    }

    #[test]
    fn test_zero_slots_rejected() {
        let config = EngineConfig {
            slot_count: 0,
            ..Default::default()
        };
        assert!(validate_engine_config(&config).is_err());
        assert!(validate_engine_config(&EngineConfig::default()).is_ok());
    }
}
