//! Serde mapping of the Notion API payloads paperdrill consumes.
//!
//! Only the fields the sync path reads are modelled; everything else
//! in the payload is ignored, and unknown property/block types fall
//! through to catch-all variants so new Notion features cannot break
//! deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Body of a database query request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    pub page_size: u32,
}

/// One page of database query results.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A database row (one paper).
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, PageProperty>,
}

impl Page {
    /// The page title, joined over its rich-text runs. `None` when the
    /// title property is empty.
    pub fn title(&self) -> Option<String> {
        self.properties.values().find_map(|property| match property {
            PageProperty::Title { title } => {
                let joined = join_rich_text(title);
                if joined.is_empty() {
                    None
                } else {
                    Some(joined)
                }
            }
            _ => None,
        })
    }

    /// Tags from a multi-select property, if the database has one.
    pub fn tags(&self) -> Vec<String> {
        self.properties
            .values()
            .find_map(|property| match property {
                PageProperty::MultiSelect { multi_select } => {
                    Some(multi_select.iter().map(|o| o.name.clone()).collect())
                }
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// A page property. Only the variants the sync path reads are typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageProperty {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    MultiSelect { multi_select: Vec<SelectOption> },
    #[serde(other)]
    Other,
}

/// One rich-text run. Notion pre-renders `plain_text` for every run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectOption {
    pub name: String,
}

/// One page of block children.
#[derive(Debug, Clone, Deserialize)]
pub struct BlocksResponse {
    pub results: Vec<Block>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A content block. Text-bearing block types map to their rich-text
/// payload; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph { paragraph: RichTextContainer },
    #[serde(rename = "heading_1")]
    Heading1 { heading_1: RichTextContainer },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: RichTextContainer },
    #[serde(rename = "heading_3")]
    Heading3 { heading_3: RichTextContainer },
    BulletedListItem { bulleted_list_item: RichTextContainer },
    NumberedListItem { numbered_list_item: RichTextContainer },
    ToDo { to_do: RichTextContainer },
    Quote { quote: RichTextContainer },
    Callout { callout: RichTextContainer },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RichTextContainer {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

impl Block {
    /// The block's text content, if it is a text-bearing block with
    /// non-empty content.
    pub fn plain_text(&self) -> Option<String> {
        let container = match self {
            Block::Paragraph { paragraph } => paragraph,
            Block::Heading1 { heading_1 } => heading_1,
            Block::Heading2 { heading_2 } => heading_2,
            Block::Heading3 { heading_3 } => heading_3,
            Block::BulletedListItem { bulleted_list_item } => bulleted_list_item,
            Block::NumberedListItem { numbered_list_item } => numbered_list_item,
            Block::ToDo { to_do } => to_do,
            Block::Quote { quote } => quote,
            Block::Callout { callout } => callout,
            Block::Other => return None,
        };

        let text = join_rich_text(&container.rich_text);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn join_rich_text(runs: &[RichText]) -> String {
    runs.iter()
        .map(|r| r.plain_text.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}
