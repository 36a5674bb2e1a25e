//! Filter-metadata menu served to clients so they can render the search
//! form. Everything here comes from configuration; nothing is read from the
//! corpus.

use serde::Serialize;

use crate::config::{Config, MenuOptionConfig};

#[derive(Debug, Clone, Serialize)]
pub struct MenuOption {
    pub id: String,
    pub name: String,
    /// Always `0`; clients track selection themselves.
    pub selected: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuGroup {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub icon: String,
    pub options: Vec<MenuOption>,
}

fn group(id: usize, kind: &str, name: &str, icon: &str, options: Vec<MenuOption>) -> MenuGroup {
    MenuGroup {
        id: id.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        options,
    }
}

fn options(items: &[MenuOptionConfig]) -> Vec<MenuOption> {
    items
        .iter()
        .map(|item| MenuOption {
            id: item.id.clone(),
            name: item.name.clone(),
            selected: 0,
        })
        .collect()
}

/// Build the three menu groups: `source`, `socialNetwork` and `time`.
pub fn build_menu(config: &Config) -> Vec<MenuGroup> {
    let sources = config
        .corpus
        .sources
        .iter()
        .map(|s| MenuOption {
            id: s.id.clone(),
            name: s.display_name().to_string(),
            selected: 0,
        })
        .collect();

    vec![
        group(0, "source", "SOURCE", "📄", sources),
        group(1, "socialNetwork", "SOCIAL NETWORK", "📄", options(&config.menu.platforms)),
        group(2, "time", "TIME", "🌐", options(&config.menu.time_ranges)),
    ]
}
