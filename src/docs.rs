use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use spay_core::{ErrorDetail, ListParams, Pagination};
use spay_models::providers::{CreateProviderDto, ProviderListResponse, ProviderResponse};
use spay_models::resources::{
    AddPermissionDto, ClientCredentials, CreateResourceDto, DeleteServiceResponse,
    DeleteShopResponse, PermissionListResponse, PermissionResponse, ServiceListResponse,
    ServiceResponse, ShopListResponse, ShopResponse, UpdateResourceDto,
};
use spay_models::transactions::{
    CreateTransactionDto, TransactionListResponse, TransactionResponse,
};
use spay_models::users::{
    AuthResponse, ChangeRoleDto, ChangeRoleResponse, DeleteUserResponse, LoginDto,
    RegisterUserDto, UpdateUserDto, UserListResponse, UserResponse,
};
use spay_models::{
    GlobalRole, OperationMode, OperationState, Permission, Provider, Resource, ResourceRef,
    ResourceRole, Transaction, User,
};

use crate::modules::health::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::health::health_check,
        crate::modules::users::controller::register,
        crate::modules::users::controller::login,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::users::controller::change_role,
        crate::modules::shops::controller::list_shops,
        crate::modules::shops::controller::create_shop,
        crate::modules::shops::controller::get_shop,
        crate::modules::shops::controller::update_shop,
        crate::modules::shops::controller::delete_shop,
        crate::modules::shops::controller::show_shop_client,
        crate::modules::shops::controller::regenerate_shop_client,
        crate::modules::shops::controller::list_shop_permissions,
        crate::modules::shops::controller::add_shop_permission,
        crate::modules::services::controller::list_services,
        crate::modules::services::controller::create_service,
        crate::modules::services::controller::get_service,
        crate::modules::services::controller::update_service,
        crate::modules::services::controller::delete_service,
        crate::modules::services::controller::show_service_client,
        crate::modules::services::controller::regenerate_service_client,
        crate::modules::services::controller::list_service_permissions,
        crate::modules::services::controller::add_service_permission,
        crate::modules::transactions::controller::list_transactions,
        crate::modules::transactions::controller::create_transaction,
        crate::modules::transactions::controller::get_transaction,
        crate::modules::providers::controller::list_providers,
        crate::modules::providers::controller::create_provider,
    ),
    components(
        schemas(
            ErrorDetail,
            Pagination,
            ListParams,
            HealthResponse,
            GlobalRole,
            ResourceRole,
            User,
            RegisterUserDto,
            LoginDto,
            UpdateUserDto,
            ChangeRoleDto,
            AuthResponse,
            UserResponse,
            ChangeRoleResponse,
            DeleteUserResponse,
            UserListResponse,
            Resource,
            ResourceRef,
            Permission,
            CreateResourceDto,
            UpdateResourceDto,
            AddPermissionDto,
            ClientCredentials,
            ShopResponse,
            ShopListResponse,
            DeleteShopResponse,
            ServiceResponse,
            ServiceListResponse,
            DeleteServiceResponse,
            PermissionListResponse,
            PermissionResponse,
            Provider,
            CreateProviderDto,
            ProviderResponse,
            ProviderListResponse,
            OperationMode,
            OperationState,
            Transaction,
            CreateTransactionDto,
            TransactionResponse,
            TransactionListResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Users", description = "Registration, login and user management"),
        (name = "Shops", description = "Shop management and shop permissions"),
        (name = "Services", description = "Service management and service permissions"),
        (name = "Transactions", description = "Payment transactions recorded on services"),
        (name = "Providers", description = "Payment provider catalogue")
    ),
    info(
        title = "SPAY API",
        version = "0.1.0",
        description = "Multi-tenant payment gateway backend. Every response is wrapped in an envelope carrying status, message, path and timing.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_module() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/health",
            "/api/users",
            "/api/users/{id}",
            "/api/shops/{id}/permissions",
            "/api/services/{id}/regenerate-client",
            "/api/transactions/{id}",
            "/api/providers",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_shop_and_service_operations_mirror_each_other() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        let shop_paths: Vec<&String> =
            paths.keys().filter(|p| p.starts_with("/api/shops")).collect();
        assert_eq!(shop_paths.len(), 6);

        for shop_path in shop_paths {
            let service_path = shop_path.replace("/api/shops", "/api/services");
            let shop = &paths[shop_path];
            let service = paths
                .get(&service_path)
                .unwrap_or_else(|| panic!("missing {service_path}"));

            for (s, v) in [
                (&shop.get, &service.get),
                (&shop.post, &service.post),
                (&shop.put, &service.put),
                (&shop.delete, &service.delete),
            ] {
                assert_eq!(s.is_some(), v.is_some(), "{shop_path}");
                let (Some(s), Some(v)) = (s, v) else { continue };

                assert_eq!(s.tags, Some(vec!["Shops".to_string()]));
                assert_eq!(v.tags, Some(vec!["Services".to_string()]));
                assert_eq!(
                    s.summary.as_deref().map(|t| t.replace("shop", "service")),
                    v.summary
                );
                assert_eq!(
                    s.responses.responses.keys().collect::<Vec<_>>(),
                    v.responses.responses.keys().collect::<Vec<_>>()
                );
            }
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
