crate::modules::resources::controller::resource_controller! {
    kind: Shop,
    tag: "Shops",
    list_response: ShopListResponse { shops },
    response: ShopResponse { shop },
    delete_response: DeleteShopResponse,
    paths: {
        collection: "/api/shops",
        item: "/api/shops/{id}",
        show_client: "/api/shops/{id}/show-client",
        regenerate_client: "/api/shops/{id}/regenerate-client",
        permissions: "/api/shops/{id}/permissions",
        add_permission: "/api/shops/{id}/permissions/add",
    },
    handlers: {
        list: list_shops "List shops",
        create: create_shop "Create a shop; the owner becomes its ADMIN",
        get: get_shop "Get a shop with its members",
        update: update_shop "Update a shop",
        delete: delete_shop "Delete a shop and its permissions",
        show_client: show_shop_client "Show the shop's client credentials",
        regenerate_client: regenerate_shop_client "Rotate the shop's client credentials",
        list_permissions: list_shop_permissions "List shop members",
        add_permission: add_shop_permission "Add a member to a shop",
    },
}
