use serde::{Deserialize, Serialize};
use std::fmt;

/// 用户角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.id)
    }
}

/// 分类类型：算法或数据结构
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CategoryType {
    #[serde(rename = "Algoritmo")]
    Algorithm,
    #[serde(rename = "Estructura de datos")]
    DataStructure,
}

impl CategoryType {
    pub const ALL: [CategoryType; 2] = [CategoryType::DataStructure, CategoryType::Algorithm];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Algorithm => "Algoritmo",
            CategoryType::DataStructure => "Estructura de datos",
        }
    }

    /// 接受 API 原文，也接受命令行里的简写
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "algoritmo" | "algorithm" | "algo" => Some(CategoryType::Algorithm),
            "estructura de datos" | "data-structure" | "estructura" | "ds" => {
                Some(CategoryType::DataStructure)
            }
            _ => None,
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

/// 练习里的分类字段，可能只是 id，也可能是展开后的对象
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(String),
    Populated(Category),
}

impl CategoryRef {
    pub fn id(&self) -> &str {
        match self {
            CategoryRef::Id(id) => id,
            CategoryRef::Populated(category) => &category.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            CategoryRef::Id(_) => None,
            CategoryRef::Populated(category) => Some(&category.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tutorial {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub order: i64,
}

/// 难度：1 = 简单，2 = 困难
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    Easy,
    Hard,
}

impl Difficulty {
    /// 随机题目接口使用的查询参数
    pub fn as_query(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Hard => "hard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Fácil",
            Difficulty::Hard => "Difícil",
        }
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Hard),
            other => Err(format!("unknown exercise level {}", other)),
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        match value {
            Difficulty::Easy => 1,
            Difficulty::Hard => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Answers {
    pub correct: String,
    #[serde(default)]
    pub incorrect: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    #[serde(rename = "_id")]
    pub id: String,
    pub problem: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub level: Difficulty,
    pub category: CategoryRef,
    #[serde(default)]
    pub explanation: String,
    pub answers: Answers,
    #[serde(default)]
    pub order: i64,
}

/// 某用户在某分类下的完成记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryProgress {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub category: String,
    #[serde(default)]
    pub completed: Vec<String>,
}

/// `/exercises/total` 返回的每分类题目数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCount {
    pub category_id: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

/// 令牌负载里关心的字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user: User,
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleCredential<'a> {
    pub token: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteExerciseRequest<'a> {
    pub exercise_id: &'a str,
    pub category_id: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TutorialPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExercisePayload {
    pub problem: String,
    pub level: Difficulty,
    pub category: String,
    pub images: Vec<String>,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CategoryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub category_type: Option<CategoryType>,
}
