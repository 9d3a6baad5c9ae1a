//! Shared content tree fixtures
//!
//! ```text
//! 1 Home
//! ├── 10 Members ─ 30 Reports ─ 55 Q1
//! ├── 20 Public
//! ├── 98 Reports denied   (/reports-denied)
//! └── 99 No access        (/no-access)
//! 2 Security Rules        (rule folder, coverage shown)
//! └── 3 Members only      (denies Editors on 10 → 99, red)
//! ```

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use keepout::content::{
    ContentExport, ContentNode, GroupId, InMemoryContentTree, MemberGroup, NodeId, PathAncestry,
};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};

pub const FOLDER_TYPE: &str = "keepOutSecurityRules";
pub const RULE_TYPE: &str = "keepOutSecurityRule";

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
}

pub fn groups(names: &[&str]) -> HashSet<String> {
    names.iter().map(|g| g.to_string()).collect()
}

pub fn path(ids: &[i64]) -> PathAncestry {
    PathAncestry::from(ids.to_vec())
}

pub fn page(id: i64, parent: Option<i64>) -> ContentNode {
    ContentNode {
        id: NodeId(id),
        name: format!("Page {}", id),
        content_type: "contentPage".into(),
        published: true,
        created_at: at(1),
        parent: parent.map(NodeId),
        path: PathAncestry::default(),
        url: Some(format!("/page-{}", id)),
        properties: HashMap::new(),
    }
}

pub fn folder(id: i64, show_coverage: bool) -> ContentNode {
    let mut node = page(id, None);
    node.content_type = FOLDER_TYPE.into();
    node.url = None;
    node.properties
        .insert("showRuleCoverage".into(), Value::Bool(show_coverage));
    node
}

pub fn rule_item(
    id: i64,
    folder: i64,
    day: u32,
    denied_groups: &str,
    secure: i64,
    no_access: i64,
    colour: &str,
) -> ContentNode {
    let mut node = page(id, Some(folder));
    node.content_type = RULE_TYPE.into();
    node.created_at = at(day);
    node.url = None;
    node.properties = HashMap::from([
        ("deniedMemberGroups".to_string(), json!(denied_groups)),
        ("pageToSecure".to_string(), json!({ "id": secure })),
        ("noAccessPage".to_string(), json!(no_access)),
        (
            "coverageColour".to_string(),
            json!({ "label": colour, "value": "000000" }),
        ),
    ]);
    node
}

pub fn member_groups() -> Vec<MemberGroup> {
    vec![
        MemberGroup {
            id: GroupId(1),
            name: "Editors".into(),
        },
        MemberGroup {
            id: GroupId(2),
            name: "Writers".into(),
        },
        MemberGroup {
            id: GroupId(3),
            name: "Guests".into(),
        },
    ]
}

/// Site pages without any rule folder
pub fn site_pages() -> Vec<ContentNode> {
    let mut no_access = page(99, Some(1));
    no_access.url = Some("/no-access".into());
    let mut reports_denied = page(98, Some(1));
    reports_denied.url = Some("/reports-denied".into());

    vec![
        page(1, None),
        page(10, Some(1)),
        page(30, Some(10)),
        page(55, Some(30)),
        page(20, Some(1)),
        reports_denied,
        no_access,
    ]
}

/// The sample site with one rule: Editors are kept out of Members (10)
pub fn sample_export() -> ContentExport {
    let mut nodes = site_pages();
    nodes.push(folder(2, true));
    nodes.push(rule_item(3, 2, 1, "1", 10, 99, "red"));
    ContentExport {
        nodes,
        groups: member_groups(),
    }
}

pub fn sample_site() -> InMemoryContentTree {
    InMemoryContentTree::from_export(sample_export()).unwrap()
}

pub fn site_without_rules() -> InMemoryContentTree {
    InMemoryContentTree::from_export(ContentExport {
        nodes: site_pages(),
        groups: member_groups(),
    })
    .unwrap()
}
