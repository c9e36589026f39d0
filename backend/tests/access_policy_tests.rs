//! Access policy tests
//!
//! Tests for role-based page and action gating:
//! - Property 6: Capability Table Enforcement
//! - Property 7: Serialized Names Round Trip

use proptest::prelude::*;
use shared::{can_access, Capability, Role};

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn capability_strategy() -> impl Strategy<Value = Capability> {
    prop::sample::select(Capability::ALL.to_vec())
}

/// Expected grants, written out independently of the table under test
fn expected(role: Role, capability: Capability) -> bool {
    match capability {
        Capability::ViewDashboard | Capability::ManageMovements | Capability::ViewReports => true,
        Capability::ManageMedicines => matches!(role, Role::Supervisor | Role::Administrator),
        Capability::ManageWarehouses | Capability::ManageUsers | Capability::ViewAuditLog => {
            role == Role::Administrator
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_operator_capabilities() {
        assert!(can_access(Role::Operator, Capability::ViewDashboard));
        assert!(can_access(Role::Operator, Capability::ManageMovements));
        assert!(can_access(Role::Operator, Capability::ViewReports));
        assert!(!can_access(Role::Operator, Capability::ManageMedicines));
        assert!(!can_access(Role::Operator, Capability::ManageWarehouses));
        assert!(!can_access(Role::Operator, Capability::ManageUsers));
        assert!(!can_access(Role::Operator, Capability::ViewAuditLog));
    }

    #[test]
    fn test_supervisor_capabilities() {
        assert!(can_access(Role::Supervisor, Capability::ManageMedicines));
        assert!(can_access(Role::Supervisor, Capability::ManageMovements));
        assert!(!can_access(Role::Supervisor, Capability::ManageWarehouses));
        assert!(!can_access(Role::Supervisor, Capability::ManageUsers));
        assert!(!can_access(Role::Supervisor, Capability::ViewAuditLog));
    }

    #[test]
    fn test_administrator_has_everything() {
        for capability in Capability::ALL {
            assert!(can_access(Role::Administrator, capability), "{capability}");
        }
        assert_eq!(Role::Administrator.capabilities().len(), Capability::ALL.len());
    }

    /// Operator and supervisor are not nested the other way round
    #[test]
    fn test_roles_are_not_a_strict_hierarchy() {
        let operator = Role::Operator.capabilities();
        let supervisor = Role::Supervisor.capabilities();

        assert!(operator.iter().all(|c| supervisor.contains(c)));
        assert!(supervisor.len() > operator.len());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("operator".parse::<Role>(), Ok(Role::Operator));
        assert_eq!("administrator".parse::<Role>(), Ok(Role::Administrator));
        assert!("admin".parse::<Role>().is_err());
        assert!("Supervisor".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_json_names() {
        assert_eq!(serde_json::to_string(&Role::Supervisor).unwrap(), "\"supervisor\"");
        assert_eq!(
            serde_json::to_string(&Capability::ViewAuditLog).unwrap(),
            "\"view_audit_log\""
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 6: Capability Table Enforcement
        /// Every (role, capability) decision matches the written policy.
        #[test]
        fn prop_access_matches_policy(role in role_strategy(), capability in capability_strategy()) {
            prop_assert_eq!(can_access(role, capability), expected(role, capability));
        }

        /// Property 7: Serialized Names Round Trip
        /// A role's stored name parses back to the same role.
        #[test]
        fn prop_role_name_round_trip(role in role_strategy()) {
            prop_assert_eq!(role.as_str().parse::<Role>(), Ok(role));
            prop_assert_eq!(role.to_string(), role.as_str());
        }
    }
}
