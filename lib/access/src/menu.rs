//! Role navigation menus.
//!
//! Menus are built fresh on every call from a static per-role layout, so the
//! same role always yields an equal tree. Roles without a dedicated portal
//! get a single dashboard entry.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Icon shown next to a menu entry.
///
/// Serialized as the kebab-case name of the icon in the portal's icon set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    Activity,
    AlertCircle,
    #[serde(rename = "bar-chart-3")]
    BarChart3,
    Brain,
    #[serde(rename = "building-2")]
    Building2,
    CheckCircle,
    Clock,
    Cpu,
    CreditCard,
    Database,
    DollarSign,
    FileText,
    Fuel,
    LayoutDashboard,
    Layers,
    MapPin,
    Monitor,
    Navigation,
    Network,
    Package,
    Phone,
    PieChart,
    Settings,
    Shield,
    ShieldCheck,
    Target,
    Truck,
    UserCheck,
    Users,
    Wrench,
}

/// A navigation entry. Groups carry children and usually no path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    /// Creates a leaf entry pointing at `path`.
    #[must_use]
    pub fn link(id: &str, label: &str, icon: Icon, path: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            icon: Some(icon),
            path: Some(path.to_string()),
            children: Vec::new(),
        }
    }

    /// Creates a group entry.
    #[must_use]
    pub fn group(id: &str, label: &str, icon: Icon, children: Vec<MenuItem>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            icon: Some(icon),
            path: None,
            children,
        }
    }

    /// Sets the path of a group entry.
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Finds the entry with `id` in this subtree, depth first.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&MenuItem> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Returns every path in this subtree, in display order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(path) = &self.path {
            out.push(path);
        }
        for child in &self.children {
            child.collect_paths(out);
        }
    }
}

/// Finds the entry with `id` anywhere in `menu`.
#[must_use]
pub fn find_in<'a>(menu: &'a [MenuItem], id: &str) -> Option<&'a MenuItem> {
    menu.iter().find_map(|item| item.find(id))
}

/// Builds the navigation menu for `role`.
#[must_use]
pub fn menu_for_role(role: &Role) -> Vec<MenuItem> {
    match role {
        Role::SuperAdmin => super_admin(),
        Role::CarrierAdmin => carrier_admin(),
        Role::FreightBrokerAdmin => freight_broker_admin(),
        Role::ShipperAdmin => shipper_admin(),
        Role::Driver => driver(),
        Role::OwnerOperator => owner_operator(),
        Role::FactoringAdmin => factoring_admin(),
        Role::Unknown(_) => vec![MenuItem::link(
            "dashboard",
            "Dashboard",
            Icon::LayoutDashboard,
            "/dashboard",
        )],
    }
}

fn super_admin() -> Vec<MenuItem> {
    vec![
        MenuItem::link("dashboard", "Command Center", Icon::Monitor, "/dashboard"),
        MenuItem::link("rates", "Rates Portal", Icon::DollarSign, "/rates"),
        MenuItem::link("directory", "Directory Portal", Icon::Building2, "/directory"),
        MenuItem::group(
            "edi",
            "EDI Intelligence",
            Icon::Database,
            vec![
                MenuItem::link("edi-dashboard", "EDI Dashboard", Icon::Activity, "/edi/dashboard"),
                MenuItem::link("edi-setup", "Setup & Config", Icon::Settings, "/edi/setup"),
                MenuItem::link("edi-matching", "Message Matching", Icon::Layers, "/edi/matching"),
                MenuItem::link(
                    "failed-tenders",
                    "Failed Tenders",
                    Icon::AlertCircle,
                    "/edi/failed-tender",
                ),
                MenuItem::link(
                    "failed-invoices",
                    "Failed Invoices",
                    Icon::FileText,
                    "/edi/failed-invoices",
                ),
                MenuItem::link("partners", "Trading Partners", Icon::Network, "/edi/partners"),
            ],
        )
        .with_path("/edi"),
        MenuItem::link("users", "Global Users", Icon::UserCheck, "/settings"),
        MenuItem::link("analytics", "Platform Analytics", Icon::BarChart3, "/analytics"),
        MenuItem::link("autonomous", "AI Orchestration", Icon::Brain, "/autonomous-system"),
        MenuItem::link("alerts", "System Alerts", Icon::Shield, "/alerts"),
        MenuItem::group(
            "api",
            "API Management",
            Icon::Cpu,
            vec![
                MenuItem::link("api-dashboard", "API Overview", Icon::Monitor, "/api/dashboard"),
                MenuItem::link("api-keys", "API Keys", Icon::ShieldCheck, "/api/keys"),
                MenuItem::link("api-logs", "Request Logs", Icon::FileText, "/api/logs"),
                MenuItem::link("api-errors", "Error Analysis", Icon::AlertCircle, "/api/errors"),
            ],
        ),
    ]
}

fn carrier_admin() -> Vec<MenuItem> {
    vec![
        MenuItem::link("dashboard", "Fleet Control", Icon::Truck, "/dashboard"),
        MenuItem::link("rates", "Rates Portal", Icon::DollarSign, "/rates"),
        MenuItem::link("directory", "Directory Portal", Icon::Building2, "/directory"),
        MenuItem::group(
            "assets",
            "Fleet Management",
            Icon::Package,
            vec![
                MenuItem::link("trucks", "Trucks", Icon::Truck, "/assets?tab=trucks"),
                MenuItem::link("trailers", "Trailers", Icon::Package, "/assets?tab=trailers"),
                MenuItem::link("units", "Units", Icon::Layers, "/assets?tab=units"),
                MenuItem::link("fuel-audit", "Fuel Audit", Icon::Fuel, "/assets?tab=fuel-audit"),
                MenuItem::link(
                    "compliance",
                    "Compliance",
                    Icon::ShieldCheck,
                    "/assets?tab=compliance",
                ),
                MenuItem::link(
                    "fleet-tracker",
                    "Fleet Tracker",
                    Icon::Navigation,
                    "/assets?tab=fleet-tracker",
                ),
            ],
        ),
        MenuItem::link("shipments", "Load Management", Icon::Package, "/shipments"),
        MenuItem::link("workers", "Driver Network", Icon::Users, "/workers"),
        MenuItem::link("financials", "Financial Hub", Icon::CreditCard, "/financials"),
        MenuItem::link("analytics", "Performance Intel", Icon::BarChart3, "/analytics"),
    ]
}

fn freight_broker_admin() -> Vec<MenuItem> {
    vec![
        MenuItem::link("dashboard", "Broker Hub", Icon::Building2, "/dashboard"),
        MenuItem::link("rates", "Rates Portal", Icon::DollarSign, "/rates"),
        MenuItem::link("directory", "Directory Portal", Icon::Building2, "/directory"),
        MenuItem::link("loadboard", "Load Marketplace", Icon::Package, "/loadboard"),
        MenuItem::link("quotes", "Rate Intelligence", Icon::DollarSign, "/quotes"),
        MenuItem::link("shipments", "Shipment Flow", Icon::MapPin, "/shipments"),
        MenuItem::group(
            "networks",
            "Network Partners",
            Icon::Network,
            vec![
                MenuItem::link("customers", "Customers", Icon::Users, "/networks?tab=customers"),
                MenuItem::link("vendors", "Vendors", Icon::Building2, "/networks?tab=vendors"),
                MenuItem::link("locations", "Locations", Icon::MapPin, "/networks?tab=locations"),
                MenuItem::link("terminals", "Terminals", Icon::Layers, "/networks?tab=terminals"),
            ],
        ),
        MenuItem::link("crm", "Customer Relations", Icon::Users, "/crm"),
        MenuItem::link("analytics", "Market Analytics", Icon::BarChart3, "/analytics"),
    ]
}

fn shipper_admin() -> Vec<MenuItem> {
    vec![
        MenuItem::link("dashboard", "Overview", Icon::LayoutDashboard, "/dashboard"),
        MenuItem::link("shipments", "Shipments", Icon::Package, "/dashboard?tab=shipments"),
        MenuItem::link("carriers", "Carriers", Icon::Truck, "/dashboard?tab=carriers"),
        MenuItem::link("tracking", "Tracking", Icon::MapPin, "/dashboard?tab=tracking"),
        MenuItem::link("invoices", "Invoices", Icon::FileText, "/dashboard?tab=invoices"),
        MenuItem::link("analytics", "Analytics", Icon::BarChart3, "/dashboard?tab=analytics"),
    ]
}

fn driver() -> Vec<MenuItem> {
    vec![
        MenuItem::link("dashboard", "Driver Hub", Icon::Navigation, "/dashboard"),
        MenuItem::link("routes", "My Routes", Icon::MapPin, "/routes"),
        MenuItem::link("logs", "HOS Logs", Icon::Clock, "/logs"),
        MenuItem::link("inspection", "Vehicle Check", Icon::CheckCircle, "/inspection"),
        MenuItem::link("fuel", "Fuel Reports", Icon::Fuel, "/fuel"),
        MenuItem::link("maintenance", "Maintenance", Icon::Wrench, "/maintenance"),
        MenuItem::link("support", "Dispatch Support", Icon::Phone, "/support"),
    ]
}

fn owner_operator() -> Vec<MenuItem> {
    vec![
        MenuItem::link("dashboard", "Business Hub", Icon::Target, "/dashboard"),
        MenuItem::link("loads", "Load Opportunities", Icon::Package, "/loads"),
        MenuItem::link("financials", "Business Finance", Icon::DollarSign, "/financials"),
        MenuItem::link("maintenance", "Fleet Maintenance", Icon::Wrench, "/maintenance"),
        MenuItem::link("fuel", "Fuel Management", Icon::Fuel, "/fuel"),
        MenuItem::link("analytics", "Business Intel", Icon::PieChart, "/analytics"),
        MenuItem::link("tax", "Tax Management", Icon::FileText, "/tax"),
    ]
}

fn factoring_admin() -> Vec<MenuItem> {
    vec![
        MenuItem::link("dashboard", "Dashboard", Icon::LayoutDashboard, "/dashboard"),
        MenuItem::link("invoices", "Invoices", Icon::FileText, "/factoring?tab=invoices"),
        MenuItem::link("payments", "Payments", Icon::CreditCard, "/factoring?tab=payments"),
        MenuItem::link("clients", "Clients", Icon::Users, "/factoring?tab=clients"),
        MenuItem::link("disputes", "Disputes", Icon::AlertCircle, "/factoring?tab=disputes"),
        MenuItem::link("reports", "Reports", Icon::BarChart3, "/factoring?tab=reports"),
        MenuItem::link("settings", "Settings", Icon::Settings, "/factoring?tab=settings"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_roles() -> Vec<Role> {
        let mut roles = Role::known().to_vec();
        roles.push(Role::parse("dispatcher"));
        roles
    }

    #[test]
    fn menus_are_pure() {
        for role in all_roles() {
            assert_eq!(menu_for_role(&role), menu_for_role(&role), "{role}");
        }
    }

    #[test]
    fn every_menu_starts_at_the_dashboard() {
        for role in all_roles() {
            let menu = menu_for_role(&role);
            let first = menu.first().expect("non-empty menu");
            assert_eq!(first.id, "dashboard");
            assert_eq!(first.path.as_deref(), Some("/dashboard"));
        }
    }

    #[test]
    fn ids_are_unique_within_a_menu() {
        for role in all_roles() {
            let menu = menu_for_role(&role);
            let mut seen = HashSet::new();
            let mut stack: Vec<&MenuItem> = menu.iter().collect();
            while let Some(item) = stack.pop() {
                assert!(seen.insert(item.id.clone()), "duplicate id {} for {role}", item.id);
                stack.extend(item.children.iter());
            }
        }
    }

    #[test]
    fn unknown_role_gets_minimal_menu() {
        let menu = menu_for_role(&Role::parse("dispatcher"));
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].label, "Dashboard");
        assert!(menu[0].children.is_empty());
    }

    #[test]
    fn super_admin_menu_nests_edi_and_api() {
        let menu = menu_for_role(&Role::SuperAdmin);
        let edi = find_in(&menu, "edi").expect("edi group");
        assert_eq!(edi.children.len(), 6);
        assert_eq!(
            find_in(&menu, "api-keys").and_then(|item| item.path.as_deref()),
            Some("/api/keys")
        );
        assert!(find_in(&menu, "api").and_then(|item| item.path.as_ref()).is_none());
    }

    #[test]
    fn paths_flatten_in_display_order() {
        let menu = menu_for_role(&Role::CarrierAdmin);
        let assets = find_in(&menu, "assets").expect("assets group");
        assert_eq!(
            assets.paths(),
            vec![
                "/assets?tab=trucks",
                "/assets?tab=trailers",
                "/assets?tab=units",
                "/assets?tab=fuel-audit",
                "/assets?tab=compliance",
                "/assets?tab=fleet-tracker",
            ]
        );
    }

    #[test]
    fn driver_menu_has_expected_entries() {
        let labels: Vec<_> = menu_for_role(&Role::Driver)
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "Driver Hub",
                "My Routes",
                "HOS Logs",
                "Vehicle Check",
                "Fuel Reports",
                "Maintenance",
                "Dispatch Support",
            ]
        );
    }

    #[test]
    fn menu_item_serializes_without_empty_fields() {
        let item = MenuItem::link("rates", "Rates Portal", Icon::BarChart3, "/rates");
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["icon"], "bar-chart-3");
        assert!(json.get("children").is_none());

        let group = &menu_for_role(&Role::FreightBrokerAdmin)[6];
        let json = serde_json::to_value(group).expect("serialize");
        assert!(json.get("path").is_none());
        assert_eq!(json["icon"], "network");
    }
}
