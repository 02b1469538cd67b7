//! Static chrome: navigation bar and footer

pub const BRAND: &str = "Kodigo";

/// One entry of the navigation bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub route: &'static str,
}

pub const NAV_LINKS: [NavLink; 3] = [
    NavLink {
        label: "Tasks",
        route: "/",
    },
    NavLink {
        label: "Appointments",
        route: "/appointments",
    },
    NavLink {
        label: "Chat",
        route: "/chat",
    },
];

/// Navigation bar, with the active route marked
pub fn navbar(active_route: &str) -> String {
    let links: Vec<String> = NAV_LINKS
        .iter()
        .map(|link| {
            if link.route == active_route {
                format!("[{}]", link.label)
            } else {
                link.label.to_string()
            }
        })
        .collect();
    format!("{}  |  {}", BRAND, links.join("  "))
}

pub fn footer(year: i32) -> String {
    format!("(c) {} {}. All rights reserved.", year, BRAND)
}
