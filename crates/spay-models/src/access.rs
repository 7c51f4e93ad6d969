//! Permission evaluation over a user and its already-loaded permission
//! records. Nothing here touches the database.

use uuid::Uuid;

use crate::roles::{GlobalRole, ResourceKind, ResourceRole};
use crate::users::User;

/// Global role check. ADMIN passes everything and MANAGER also satisfies
/// MERCHANT-level checks.
pub fn is_grant(user: &User, required: GlobalRole) -> bool {
    user.role == GlobalRole::Admin
        || user.role == required
        || (required == GlobalRole::Merchant && user.role == GlobalRole::Manager)
}

/// Resource-scoped check against the user's permission records of `kind`.
///
/// A resource ADMIN passes every check and a DEV record satisfies a MANAGER
/// check. A DEV check is only met by a DEV or ADMIN record.
pub fn is_resource_grant(
    user: &User,
    kind: ResourceKind,
    resource_id: Uuid,
    required: ResourceRole,
) -> bool {
    if user.role == GlobalRole::Admin {
        return true;
    }

    user.permissions(kind)
        .iter()
        .filter(|p| p.resource.id() == resource_id)
        .any(|p| {
            p.role == ResourceRole::Admin
                || p.role == required
                || (required == ResourceRole::Manager && p.role == ResourceRole::Dev)
        })
}

/// Update, show-client and regenerate-client.
pub fn manager_gate(user: &User, kind: ResourceKind, resource_id: Uuid) -> bool {
    is_grant(user, GlobalRole::Manager)
        || is_resource_grant(user, kind, resource_id, ResourceRole::Manager)
}

/// Resource deletion.
///
/// NOTE: evaluated literally as
/// `MANAGER || !(MERCHANT && !resource MANAGER)`. The negation lets through
/// any caller that fails the MERCHANT check; since every decoded role passes
/// it, this currently matches [`manager_gate`]. `strict` uses the manager
/// gate directly.
pub fn delete_gate(user: &User, kind: ResourceKind, resource_id: Uuid, strict: bool) -> bool {
    if strict {
        return manager_gate(user, kind, resource_id);
    }

    is_grant(user, GlobalRole::Manager)
        || !(is_grant(user, GlobalRole::Merchant)
            && !is_resource_grant(user, kind, resource_id, ResourceRole::Manager))
}

/// Permission list/add and transaction create/read.
pub fn is_member(user: &User, kind: ResourceKind, resource_id: Uuid, role: ResourceRole) -> bool {
    is_grant(user, GlobalRole::Manager)
        || (is_grant(user, GlobalRole::Merchant)
            && is_resource_grant(user, kind, resource_id, role))
}

/// Role the caller must hold on a resource to grant `requested` on it.
pub fn add_permission_required_role(requested: ResourceRole) -> ResourceRole {
    match requested {
        ResourceRole::Admin => ResourceRole::Admin,
        _ => ResourceRole::Manager,
    }
}

/// Ids of resources of `kind` the user may list, `None` when unrestricted.
pub fn visible_resource_ids(user: &User, kind: ResourceKind) -> Option<Vec<Uuid>> {
    if is_grant(user, GlobalRole::Manager) {
        return None;
    }

    let mut ids: Vec<Uuid> = user
        .permissions(kind)
        .iter()
        .map(|p| p.resource.id())
        .filter(|id| is_resource_grant(user, kind, *id, ResourceRole::Dev))
        .collect();
    ids.sort();
    ids.dedup();
    Some(ids)
}

/// Services whose members the user may list, `None` when unrestricted.
pub fn manageable_service_ids(user: &User) -> Option<Vec<Uuid>> {
    if is_grant(user, GlobalRole::Manager) {
        return None;
    }

    let mut ids: Vec<Uuid> = user
        .service_permissions
        .iter()
        .map(|p| p.resource.id())
        .filter(|id| is_resource_grant(user, ResourceKind::Service, *id, ResourceRole::Manager))
        .collect();
    ids.sort();
    ids.dedup();
    Some(ids)
}

pub fn can_update_profile(caller: &User, target: &User) -> bool {
    !(!is_grant(caller, GlobalRole::Manager)
        && is_grant(caller, GlobalRole::Merchant)
        && caller.auth_id != target.auth_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Permission, ResourceRef};
    use chrono::Utc;

    fn user(role: GlobalRole) -> User {
        User {
            id: Uuid::new_v4(),
            auth_id: Uuid::new_v4().to_string(),
            first_name: "Awa".to_string(),
            last_name: "Kone".to_string(),
            phone_prefix: "225".to_string(),
            phone_number: "0700000000".to_string(),
            email: String::new(),
            country: "civ".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            shop_permissions: Vec::new(),
            service_permissions: Vec::new(),
        }
    }

    fn grant(user: &mut User, kind: ResourceKind, resource_id: Uuid, role: ResourceRole) {
        let permission = Permission {
            id: Uuid::new_v4(),
            user_id: user.id,
            resource: ResourceRef::new(kind, resource_id),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user: None,
        };
        user.permissions_mut(kind).push(permission);
    }

    #[test]
    fn test_is_grant_admin_only_for_admin() {
        for role in GlobalRole::ALL {
            assert_eq!(
                is_grant(&user(role), GlobalRole::Admin),
                role == GlobalRole::Admin
            );
        }
    }

    #[test]
    fn test_manager_satisfies_merchant() {
        let manager = user(GlobalRole::Manager);
        assert!(is_grant(&manager, GlobalRole::Merchant));
        assert!(is_grant(&manager, GlobalRole::Manager));

        let merchant = user(GlobalRole::Merchant);
        assert!(is_grant(&merchant, GlobalRole::Merchant));
        assert!(!is_grant(&merchant, GlobalRole::Manager));
    }

    #[test]
    fn test_dev_row_satisfies_manager_but_not_admin() {
        let shop = Uuid::new_v4();
        let mut u = user(GlobalRole::Merchant);
        grant(&mut u, ResourceKind::Shop, shop, ResourceRole::Dev);

        assert!(is_resource_grant(&u, ResourceKind::Shop, shop, ResourceRole::Dev));
        assert!(is_resource_grant(&u, ResourceKind::Shop, shop, ResourceRole::Manager));
        assert!(!is_resource_grant(&u, ResourceKind::Shop, shop, ResourceRole::Admin));
    }

    #[test]
    fn test_manager_row_does_not_satisfy_dev() {
        let shop = Uuid::new_v4();
        let mut u = user(GlobalRole::Merchant);
        grant(&mut u, ResourceKind::Shop, shop, ResourceRole::Manager);

        assert!(!is_resource_grant(&u, ResourceKind::Shop, shop, ResourceRole::Dev));
        assert!(is_resource_grant(&u, ResourceKind::Shop, shop, ResourceRole::Manager));
    }

    #[test]
    fn test_resource_admin_subsumes_everything() {
        let service = Uuid::new_v4();
        let mut u = user(GlobalRole::Merchant);
        grant(&mut u, ResourceKind::Service, service, ResourceRole::Admin);

        for role in ResourceRole::ALL {
            assert!(is_resource_grant(&u, ResourceKind::Service, service, role));
        }
    }

    #[test]
    fn test_rows_are_scoped_by_kind_and_id() {
        let id = Uuid::new_v4();
        let mut u = user(GlobalRole::Merchant);
        grant(&mut u, ResourceKind::Shop, id, ResourceRole::Admin);

        assert!(!is_resource_grant(&u, ResourceKind::Service, id, ResourceRole::Dev));
        assert!(!is_resource_grant(
            &u,
            ResourceKind::Shop,
            Uuid::new_v4(),
            ResourceRole::Dev
        ));
    }

    #[test]
    fn test_global_admin_passes_without_rows() {
        let admin = user(GlobalRole::Admin);
        let id = Uuid::new_v4();
        for kind in [ResourceKind::Shop, ResourceKind::Service] {
            for role in ResourceRole::ALL {
                assert!(is_resource_grant(&admin, kind, id, role));
                assert!(is_member(&admin, kind, id, role));
            }
            assert!(manager_gate(&admin, kind, id));
            assert!(delete_gate(&admin, kind, id, false));
            assert!(delete_gate(&admin, kind, id, true));
        }
    }

    #[test]
    fn test_manager_gate() {
        let shop = Uuid::new_v4();
        assert!(manager_gate(&user(GlobalRole::Manager), ResourceKind::Shop, shop));
        assert!(!manager_gate(&user(GlobalRole::Merchant), ResourceKind::Shop, shop));

        let mut dev = user(GlobalRole::Merchant);
        grant(&mut dev, ResourceKind::Shop, shop, ResourceRole::Dev);
        // DEV satisfies a MANAGER check
        assert!(manager_gate(&dev, ResourceKind::Shop, shop));
    }

    #[test]
    fn test_delete_gate_literal_and_strict_agree_for_decoded_roles() {
        let shop = Uuid::new_v4();
        let stranger = user(GlobalRole::Merchant);
        assert!(!delete_gate(&stranger, ResourceKind::Shop, shop, false));
        assert!(!delete_gate(&stranger, ResourceKind::Shop, shop, true));

        let mut owner = user(GlobalRole::Merchant);
        grant(&mut owner, ResourceKind::Shop, shop, ResourceRole::Admin);
        assert!(delete_gate(&owner, ResourceKind::Shop, shop, false));
        assert!(delete_gate(&owner, ResourceKind::Shop, shop, true));

        let manager = user(GlobalRole::Manager);
        assert!(delete_gate(&manager, ResourceKind::Shop, shop, false));
    }

    #[test]
    fn test_membership_check() {
        let service = Uuid::new_v4();
        let mut dev = user(GlobalRole::Merchant);
        grant(&mut dev, ResourceKind::Service, service, ResourceRole::Dev);

        assert!(is_member(&dev, ResourceKind::Service, service, ResourceRole::Dev));
        assert!(is_member(&dev, ResourceKind::Service, service, ResourceRole::Manager));
        assert!(!is_member(&dev, ResourceKind::Service, service, ResourceRole::Admin));
        assert!(!is_member(
            &user(GlobalRole::Merchant),
            ResourceKind::Service,
            service,
            ResourceRole::Dev
        ));
        assert!(is_member(
            &user(GlobalRole::Manager),
            ResourceKind::Service,
            service,
            ResourceRole::Admin
        ));
    }

    #[test]
    fn test_add_permission_required_role() {
        assert_eq!(
            add_permission_required_role(ResourceRole::Dev),
            ResourceRole::Manager
        );
        assert_eq!(
            add_permission_required_role(ResourceRole::Manager),
            ResourceRole::Manager
        );
        assert_eq!(
            add_permission_required_role(ResourceRole::Admin),
            ResourceRole::Admin
        );
    }

    #[test]
    fn test_visible_resource_ids() {
        assert_eq!(
            visible_resource_ids(&user(GlobalRole::Manager), ResourceKind::Shop),
            None
        );

        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut u = user(GlobalRole::Merchant);
        grant(&mut u, ResourceKind::Shop, a, ResourceRole::Dev);
        grant(&mut u, ResourceKind::Shop, b, ResourceRole::Manager);

        // a MANAGER row does not satisfy a DEV check
        assert_eq!(visible_resource_ids(&u, ResourceKind::Shop), Some(vec![a]));
        assert_eq!(
            visible_resource_ids(&u, ResourceKind::Service),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_manageable_service_ids() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut u = user(GlobalRole::Merchant);
        grant(&mut u, ResourceKind::Service, a, ResourceRole::Dev);
        grant(&mut u, ResourceKind::Service, b, ResourceRole::Admin);

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(manageable_service_ids(&u), Some(expected));
        assert_eq!(manageable_service_ids(&user(GlobalRole::Admin)), None);
    }

    #[test]
    fn test_profile_update() {
        let caller = user(GlobalRole::Merchant);
        let other = user(GlobalRole::Merchant);
        assert!(can_update_profile(&caller, &caller));
        assert!(!can_update_profile(&caller, &other));
        assert!(can_update_profile(&user(GlobalRole::Manager), &other));
    }
}
