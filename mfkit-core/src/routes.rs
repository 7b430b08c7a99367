//! Route table announced to the shell.

use serde::{Deserialize, Serialize};

use crate::config::Environment;

/// A single navigable page of the child application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct RouteItem {
    /// Absolute path inside the shell, including the route prefix.
    pub path: String,
    /// Menu label.
    pub name: String,
    /// Icon identifier understood by the shell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Exposed component rendering the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Whether the shell shows a back button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_back: Option<bool>,
    /// Target of the back button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_path: Option<String>,
    /// Permissions required to open the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Whether the page appears in the shell's menu.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in_menu: Option<bool>,
    /// Menu position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_order: Option<u32>,
}

/// The child application's routing contract with the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct AppRouteConfig {
    /// Module key.
    pub app_key: String,
    /// Display name.
    pub app_name: String,
    /// Prefix of every route path.
    pub route_prefix: String,
    /// Pages.
    pub routes: Vec<RouteItem>,
    /// Permissions required to enter the application at all.
    pub permissions: Vec<String>,
    /// Whether the shell should mount the application.
    pub enabled: bool,
}

impl AppRouteConfig {
    /// The default route table of `module`.
    #[must_use]
    pub fn for_module(module: &str, display_name: &str) -> Self {
        let prefix = format!("/{module}");
        let dashboard = format!("{prefix}/dashboard");
        let page = |slug: &str, name: String, icon: &str, component: &str, order: u32| RouteItem {
            path: format!("{prefix}/{slug}"),
            name,
            icon: Some(icon.to_string()),
            component: Some(component.to_string()),
            show_back: Some(true),
            back_path: Some(dashboard.clone()),
            show_in_menu: Some(true),
            menu_order: Some(order),
            ..RouteItem::default()
        };

        let routes = vec![
            RouteItem {
                show_back: Some(false),
                back_path: None,
                ..page(
                    "dashboard",
                    format!("{display_name} Overview"),
                    "DashboardOutlined",
                    "Dashboard",
                    1,
                )
            },
            page("feature1", "Feature 1".to_string(), "AppstoreOutlined", "Feature1", 2),
            page("feature2", "Feature 2".to_string(), "SettingOutlined", "Feature2", 3),
            RouteItem {
                back_path: None,
                ..page("settings", "Settings".to_string(), "ControlOutlined", "Settings", 4)
            },
            page("store-demo", "Store Demo".to_string(), "DatabaseOutlined", "StoreDemo", 5),
        ];

        Self {
            app_key: module.to_string(),
            app_name: display_name.to_string(),
            route_prefix: prefix,
            routes,
            permissions: vec![format!("{module}:read")],
            enabled: true,
        }
    }

    /// The route table for `environment`; development adds a debug page.
    #[must_use]
    pub fn for_environment(module: &str, display_name: &str, environment: Environment) -> Self {
        let mut config = Self::for_module(module, display_name);
        if environment == Environment::Development {
            config.routes.push(RouteItem {
                path: format!("/{module}/debug"),
                name: "Debug Tools".to_string(),
                icon: Some("BugOutlined".to_string()),
                component: Some("Debug".to_string()),
                show_back: Some(true),
                back_path: Some(format!("/{module}/dashboard")),
                permissions: Some(vec![format!("{module}:debug")]),
                show_in_menu: Some(true),
                menu_order: Some(99),
            });
        }
        config
    }
}
