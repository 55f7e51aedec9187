//! 헬스 스냅샷 -- 파이프라인 단계별 평면 key → 수치 맵
//!
//! 각 단계(리스너, 파서)는 [`HealthReporter`]를 구현하여 자신의 상태를
//! 공용 [`HealthData`]에 기록합니다. 키는 `prefix` + 고정 이름으로 구성되어
//! 여러 단계를 하나의 맵에 병합해도 충돌하지 않습니다.

use std::collections::BTreeMap;

/// 평면 헬스 스냅샷 (키 정렬 보장)
pub type HealthData = BTreeMap<String, f64>;

/// 헬스 데이터를 제공하는 컴포넌트
pub trait HealthReporter: Send + Sync {
    /// `data`에 현재 상태를 기록합니다. 모든 키 앞에 `prefix`를 붙입니다.
    fn add_health_data(&self, data: &mut HealthData, prefix: &str);

    /// 새 맵에 현재 상태를 기록하여 반환합니다.
    fn health_snapshot(&self) -> HealthData {
        let mut data = HealthData::new();
        self.add_health_data(&mut data, "");
        data
    }
}

/// `prefix`와 `name`을 결합한 키를 생성합니다.
pub fn health_key(prefix: &str, name: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + name.len());
    key.push_str(prefix);
    key.push_str(name);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl HealthReporter for Fixed {
        fn add_health_data(&self, data: &mut HealthData, prefix: &str) {
            data.insert(health_key(prefix, "queue_depth"), 3.0);
        }
    }

    #[test]
    fn snapshot_uses_empty_prefix() {
        let snapshot = Fixed.health_snapshot();
        assert_eq!(snapshot.get("queue_depth"), Some(&3.0));
    }

    #[test]
    fn prefixed_keys_do_not_collide() {
        let mut data = HealthData::new();
        Fixed.add_health_data(&mut data, "a_");
        Fixed.add_health_data(&mut data, "b_");
        assert_eq!(data.len(), 2);
        assert!(data.contains_key("a_queue_depth"));
        assert!(data.contains_key("b_queue_depth"));
    }
}
