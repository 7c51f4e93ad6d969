crate::modules::resources::controller::resource_controller! {
    kind: Service,
    tag: "Services",
    list_response: ServiceListResponse { services },
    response: ServiceResponse { service },
    delete_response: DeleteServiceResponse,
    paths: {
        collection: "/api/services",
        item: "/api/services/{id}",
        show_client: "/api/services/{id}/show-client",
        regenerate_client: "/api/services/{id}/regenerate-client",
        permissions: "/api/services/{id}/permissions",
        add_permission: "/api/services/{id}/permissions/add",
    },
    handlers: {
        list: list_services "List services",
        create: create_service "Create a service; the owner becomes its ADMIN",
        get: get_service "Get a service with its members",
        update: update_service "Update a service",
        delete: delete_service "Delete a service and its permissions",
        show_client: show_service_client "Show the service's client credentials",
        regenerate_client: regenerate_service_client "Rotate the service's client credentials",
        list_permissions: list_service_permissions "List service members",
        add_permission: add_service_permission "Add a member to a service",
    },
}
