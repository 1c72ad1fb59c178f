//! 사용자 역할 및 역할 보유 판별.
//!
//! 역할 정보는 두 가지 형태로 존재할 수 있습니다:
//! 토큰 클레임의 단일 `role` 문자열, 그리고 계정에 연결된 역할 목록
//! (users ↔ roles 다대다). [`RoleBearer`]는 두 형태를 동일한 방식으로
//! 다루기 위한 추상화입니다.

use serde::{Deserialize, Serialize};

/// 사용자 역할.
///
/// 고정된 집합이며 런타임에 새 역할이 생성되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub enum Role {
    /// 관리자 - 전체 레코드 접근
    Admin,
    /// 치과의사 - 본인 담당 예약 접근
    Dentist,
    /// 환자 - 본인 예약 접근
    Patient,
}

impl Role {
    /// 시드 순서 그대로의 전체 역할 목록.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Dentist, Role::Patient];

    /// DB/토큰에 저장되는 대문자 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Dentist => "DENTIST",
            Role::Patient => "PATIENT",
        }
    }

    /// 문자열에서 역할 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "DENTIST" => Some(Role::Dentist),
            "PATIENT" => Some(Role::Patient),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 역할 보유 판별 추상화.
///
/// 비교는 항상 대소문자를 무시하며, 해석 불가능한 역할 이름은
/// 아무 역할도 아닌 것으로 취급합니다.
pub trait RoleBearer {
    /// 보유한 역할 이름 목록. 첫 항목이 primary 역할입니다.
    fn role_names(&self) -> Vec<String>;

    /// 특정 역할 보유 여부.
    fn holds(&self, role: Role) -> bool {
        self.role_names()
            .iter()
            .any(|name| name.eq_ignore_ascii_case(role.as_str()))
    }

    /// 허용 역할 집합과의 교집합 존재 여부.
    fn holds_any(&self, permitted: &[Role]) -> bool {
        permitted.iter().any(|role| self.holds(*role))
    }

    /// 첫 번째로 할당된 (해석 가능한) 역할.
    fn primary_role(&self) -> Option<Role> {
        self.role_names().iter().find_map(|name| Role::parse(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 단일 role 필드 형태의 신원.
    struct ScalarIdentity(Option<String>);

    impl RoleBearer for ScalarIdentity {
        fn role_names(&self) -> Vec<String> {
            self.0.iter().cloned().collect()
        }
    }

    /// 역할 목록 형태의 신원.
    struct ManyRoleIdentity(Vec<String>);

    impl RoleBearer for ManyRoleIdentity {
        fn role_names(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("Dentist"), Some(Role::Dentist));
        assert_eq!(Role::parse("patient"), Some(Role::Patient));
        assert_eq!(Role::parse("nurse"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Dentist).unwrap();
        assert_eq!(json, "\"DENTIST\"");

        let parsed: Role = serde_json::from_str("\"PATIENT\"").unwrap();
        assert_eq!(parsed, Role::Patient);
    }

    #[test]
    fn test_scalar_identity_holds() {
        let dentist = ScalarIdentity(Some("dentist".to_string()));
        assert!(dentist.holds(Role::Dentist));
        assert!(!dentist.holds(Role::Admin));
        assert!(dentist.holds_any(&[Role::Admin, Role::Dentist]));
        assert!(!dentist.holds_any(&[Role::Admin]));
        assert_eq!(dentist.primary_role(), Some(Role::Dentist));
    }

    #[test]
    fn test_scalar_identity_without_role() {
        let nobody = ScalarIdentity(None);
        assert!(!nobody.holds(Role::Patient));
        assert!(!nobody.holds_any(&Role::ALL));
        assert_eq!(nobody.primary_role(), None);
    }

    #[test]
    fn test_many_role_identity_holds() {
        let user = ManyRoleIdentity(vec!["DENTIST".to_string(), "PATIENT".to_string()]);
        assert!(user.holds(Role::Dentist));
        assert!(user.holds(Role::Patient));
        assert!(!user.holds(Role::Admin));
        assert_eq!(user.primary_role(), Some(Role::Dentist));
    }

    #[test]
    fn test_unknown_role_names_are_ignored() {
        let user = ManyRoleIdentity(vec!["receptionist".to_string()]);
        assert!(!user.holds_any(&Role::ALL));
        assert_eq!(user.primary_role(), None);
    }
}
