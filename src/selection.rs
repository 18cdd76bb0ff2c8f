//! Route parameters and the file group they select.

use std::fmt;

use crate::{FetchRequest, PanelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Notes,
    QuestionPapers,
    QuestionBank,
    Ppts,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Notes,
        Category::QuestionPapers,
        Category::QuestionBank,
        Category::Ppts,
    ];

    /// Short code shown in the path header.
    pub fn code(&self) -> &'static str {
        match self {
            Category::Notes => "Notes",
            Category::QuestionPapers => "QP",
            Category::QuestionBank => "QB",
            Category::Ppts => "PPTs",
        }
    }

    /// Human label, also the value the document store files things under.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Notes => "Notes",
            Category::QuestionPapers => "Question Papers",
            Category::QuestionBank => "Question Bank",
            Category::Ppts => "PPTs",
        }
    }

    /// Accepts either the label or the code, ignoring case.
    pub fn parse(raw: &str) -> Result<Self, PanelError> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(raw) || c.code().eq_ignore_ascii_case(raw))
            .ok_or_else(|| PanelError::UnknownCategory(raw.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw route parameters as handed over by the router. Empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub regulation: Option<String>,
    pub semester: Option<String>,
    pub group_name: Option<String>,
    pub category: Option<String>,
}

impl RouteParams {
    /// Builds the params from a lookup by route key, taking values as given.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            regulation: get("regulation"),
            semester: get("semester"),
            group_name: get("group_name"),
            category: get("category"),
        }
    }

    pub fn new(regulation: &str, semester: &str, group_name: &str, category: &str) -> Self {
        Self {
            regulation: Some(regulation.to_string()),
            semester: Some(semester.to_string()),
            group_name: Some(group_name.to_string()),
            category: Some(category.to_string()),
        }
    }

    pub fn selection(&self) -> Result<Selection, PanelError> {
        let category = present(&self.category).ok_or(PanelError::MissingSelection { field: "category" })?;
        let group_name =
            present(&self.group_name).ok_or(PanelError::MissingSelection { field: "groupName" })?;

        Ok(Selection {
            regulation: present(&self.regulation).unwrap_or_default().to_string(),
            semester: present(&self.semester).unwrap_or_default().to_string(),
            group_name: group_name.to_string(),
            category: Category::parse(category)?,
        })
    }

    pub fn header(&self) -> PathHeader {
        let category = present(&self.category).and_then(|c| Category::parse(c).ok());
        PathHeader {
            regulation: present(&self.regulation).unwrap_or_default().to_string(),
            semester: present(&self.semester).unwrap_or_default().to_string(),
            short_name: present(&self.group_name).map(short_name).unwrap_or_default().to_string(),
            category_code: category.map(|c| c.code()).unwrap_or_default().to_string(),
            category_label: category.map(|c| c.label()).unwrap_or_default().to_string(),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Third `_`-separated segment of a group name, e.g. `2021_R1_DataStructures`.
pub fn short_name(group_name: &str) -> &str {
    group_name.split('_').nth(2).unwrap_or_default()
}

/// The file group being browsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub regulation: String,
    pub semester: String,
    pub group_name: String,
    pub category: Category,
}

impl Selection {
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            category: self.category.label().to_string(),
            group_name: self.group_name.clone(),
        }
    }

    /// Whether a file stored under `other` belongs in this selection's list.
    pub fn same_group(&self, other: &Selection) -> bool {
        self.category == other.category && self.group_name == other.group_name
    }
}

/// Path segments rendered above the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathHeader {
    pub regulation: String,
    pub semester: String,
    pub short_name: String,
    pub category_code: String,
    pub category_label: String,
}

impl PathHeader {
    pub fn title(&self) -> String {
        [
            self.regulation.as_str(),
            self.semester.as_str(),
            self.short_name.as_str(),
            self.category_code.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" / ")
    }
}
