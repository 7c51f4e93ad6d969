//! Handler generator for the shop and service controllers.

/// Expands to the nine annotated handlers of one resource kind.
///
/// Every handler delegates to [`crate::modules::resources::handlers`]; the
/// invocation only supplies names, OpenAPI paths and the kind-specific
/// response bodies.
///
/// ```ignore
/// resource_controller! {
///     kind: Shop,
///     tag: "Shops",
///     list_response: ShopListResponse { shops },
///     response: ShopResponse { shop },
///     delete_response: DeleteShopResponse,
///     paths: { collection: "/api/shops", ... },
///     handlers: { list: list_shops "List shops", ... },
/// }
/// ```
macro_rules! resource_controller {
    (
        kind: $kind:ident,
        tag: $tag:literal,
        list_response: $list_response:ident { $list_field:ident },
        response: $response:ident { $field:ident },
        delete_response: $delete_response:ident,
        paths: {
            collection: $collection:literal,
            item: $item:literal,
            show_client: $show_client_path:literal,
            regenerate_client: $regenerate_client_path:literal,
            permissions: $permissions_path:literal,
            add_permission: $add_permission_path:literal $(,)?
        },
        handlers: {
            list: $list:ident $list_summary:literal,
            create: $create:ident $create_summary:literal,
            get: $get:ident $get_summary:literal,
            update: $update:ident $update_summary:literal,
            delete: $delete:ident $delete_summary:literal,
            show_client: $show_client:ident $show_client_summary:literal,
            regenerate_client: $regenerate_client:ident $regenerate_client_summary:literal,
            list_permissions: $list_permissions:ident $list_permissions_summary:literal,
            add_permission: $add_permission:ident $add_permission_summary:literal $(,)?
        } $(,)?
    ) => {
        use axum::extract::{Query, State};
        use tracing::instrument;

        use spay_core::{ApiResponse, AppError, ErrorDetail, ListParams};
        use spay_models::ResourceKind;
        use spay_models::resources::{
            $delete_response, $list_response, $response, AddPermissionDto, ClientCredentials,
            CreateResourceDto, PermissionListResponse, PermissionResponse, ResourceFilter,
            UpdateResourceDto,
        };

        use $crate::middleware::auth::CurrentUser;
        use $crate::middleware::lookup::LoadedResource;
        use $crate::modules::resources::handlers;
        use $crate::state::AppState;
        use $crate::validator::ValidatedJson;

        const KIND: ResourceKind = ResourceKind::$kind;

        #[utoipa::path(
            get,
            path = $collection,
            summary = $list_summary,
            description = "Merchants only see the ones they are a member of.",
            params(ListParams, ResourceFilter),
            responses(
                (status = 200, description = "Paginated list", body = $list_response),
                (status = 401, description = "Unauthorized", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        #[instrument(skip(state, caller))]
        pub async fn $list(
            State(state): State<AppState>,
            CurrentUser(caller): CurrentUser,
            Query(params): Query<ListParams>,
            Query(filter): Query<ResourceFilter>,
        ) -> Result<ApiResponse<$list_response>, AppError> {
            let ($list_field, pagination) =
                handlers::list(&state, &caller, KIND, &params, &filter).await?;
            Ok(ApiResponse::ok($list_response {
                $list_field,
                pagination,
            }))
        }

        #[utoipa::path(
            post,
            path = $collection,
            summary = $create_summary,
            request_body = CreateResourceDto,
            responses(
                (status = 201, description = "Created", body = $response),
                (status = 409, description = "Already exists", body = [ErrorDetail]),
                (status = 422, description = "Invalid form", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        #[instrument(skip(state, caller, dto))]
        pub async fn $create(
            State(state): State<AppState>,
            CurrentUser(caller): CurrentUser,
            ValidatedJson(dto): ValidatedJson<CreateResourceDto>,
        ) -> Result<ApiResponse<$response>, AppError> {
            let $field = handlers::create(&state, &caller, KIND, dto).await?;
            Ok(ApiResponse::created($response { $field }))
        }

        #[utoipa::path(
            get,
            path = $item,
            summary = $get_summary,
            params(("id" = Uuid, Path, description = "Resource ID")),
            responses(
                (status = 200, description = "Resource with its members", body = $response),
                (status = 404, description = "Not found", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        pub async fn $get(loaded: LoadedResource) -> ApiResponse<$response> {
            ApiResponse::ok($response {
                $field: loaded.resource,
            })
        }

        #[utoipa::path(
            put,
            path = $item,
            summary = $update_summary,
            params(("id" = Uuid, Path, description = "Resource ID")),
            request_body = UpdateResourceDto,
            responses(
                (status = 200, description = "Updated", body = $response),
                (status = 403, description = "Not a manager", body = [ErrorDetail]),
                (status = 409, description = "Already exists", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        #[instrument(skip(state, caller, loaded, dto))]
        pub async fn $update(
            State(state): State<AppState>,
            CurrentUser(caller): CurrentUser,
            loaded: LoadedResource,
            ValidatedJson(dto): ValidatedJson<UpdateResourceDto>,
        ) -> Result<ApiResponse<$response>, AppError> {
            let $field = handlers::update(&state, &caller, &loaded, dto).await?;
            Ok(ApiResponse::ok($response { $field }))
        }

        #[utoipa::path(
            delete,
            path = $item,
            summary = $delete_summary,
            params(("id" = Uuid, Path, description = "Resource ID")),
            responses(
                (status = 200, description = "Deleted", body = $delete_response),
                (status = 403, description = "Not allowed to delete", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        #[instrument(skip(state, caller, loaded))]
        pub async fn $delete(
            State(state): State<AppState>,
            CurrentUser(caller): CurrentUser,
            loaded: LoadedResource,
        ) -> Result<ApiResponse<$delete_response>, AppError> {
            handlers::delete(&state, &caller, &loaded).await?;
            Ok(ApiResponse::ok($delete_response {
                $field: loaded.resource,
                deleted: true,
            }))
        }

        #[utoipa::path(
            get,
            path = $show_client_path,
            summary = $show_client_summary,
            params(("id" = Uuid, Path, description = "Resource ID")),
            responses(
                (status = 200, description = "Client credentials", body = ClientCredentials),
                (status = 403, description = "Not a manager", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        pub async fn $show_client(
            CurrentUser(caller): CurrentUser,
            loaded: LoadedResource,
        ) -> Result<ApiResponse<ClientCredentials>, AppError> {
            Ok(ApiResponse::ok(handlers::show_client(&caller, &loaded)?))
        }

        #[utoipa::path(
            post,
            path = $regenerate_client_path,
            summary = $regenerate_client_summary,
            params(("id" = Uuid, Path, description = "Resource ID")),
            responses(
                (status = 200, description = "New client credentials", body = ClientCredentials),
                (status = 403, description = "Not a manager", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        #[instrument(skip(state, caller, loaded))]
        pub async fn $regenerate_client(
            State(state): State<AppState>,
            CurrentUser(caller): CurrentUser,
            loaded: LoadedResource,
        ) -> Result<ApiResponse<ClientCredentials>, AppError> {
            let credentials = handlers::regenerate_client(&state, &caller, &loaded).await?;
            Ok(ApiResponse::ok(credentials))
        }

        #[utoipa::path(
            get,
            path = $permissions_path,
            summary = $list_permissions_summary,
            params(("id" = Uuid, Path, description = "Resource ID"), ListParams),
            responses(
                (status = 200, description = "Paginated members", body = PermissionListResponse),
                (status = 403, description = "Not a member", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        #[instrument(skip(state, caller, loaded))]
        pub async fn $list_permissions(
            State(state): State<AppState>,
            CurrentUser(caller): CurrentUser,
            loaded: LoadedResource,
            Query(params): Query<ListParams>,
        ) -> Result<ApiResponse<PermissionListResponse>, AppError> {
            let (permissions, pagination) =
                handlers::list_permissions(&state, &caller, &loaded, &params).await?;
            Ok(ApiResponse::ok(PermissionListResponse {
                permissions,
                pagination,
            }))
        }

        #[utoipa::path(
            post,
            path = $add_permission_path,
            summary = $add_permission_summary,
            description = "Granting ADMIN requires being ADMIN; other roles require MANAGER.",
            params(("id" = Uuid, Path, description = "Resource ID")),
            request_body = AddPermissionDto,
            responses(
                (status = 201, description = "Member added", body = PermissionResponse),
                (status = 403, description = "Not allowed to add members", body = [ErrorDetail]),
                (status = 404, description = "User does not exist", body = [ErrorDetail]),
                (status = 409, description = "User already added", body = [ErrorDetail])
            ),
            security(("bearer_auth" = [])),
            tag = $tag
        )]
        #[instrument(skip(state, caller, loaded, dto))]
        pub async fn $add_permission(
            State(state): State<AppState>,
            CurrentUser(caller): CurrentUser,
            loaded: LoadedResource,
            ValidatedJson(dto): ValidatedJson<AddPermissionDto>,
        ) -> Result<ApiResponse<PermissionResponse>, AppError> {
            let permission = handlers::add_permission(&state, &caller, &loaded, dto).await?;
            Ok(ApiResponse::created(PermissionResponse { permission }))
        }
    };
}

pub(crate) use resource_controller;
