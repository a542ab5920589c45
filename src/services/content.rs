//! 管理端内容维护：教程排序、练习表单、分类、练习顺序一览

use futures::future::try_join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::{ApiError, ValidationError};
use crate::models::{
    Category, CategoryPayload, CategoryType, Difficulty, Exercise, ExercisePayload, Tutorial,
    TutorialPayload,
};
use crate::services::api::ApiClient;

pub const MAX_IMAGES: usize = 4;
pub const MAX_INCORRECT_ANSWERS: usize = 5;

/// 图片地址：http(s) 链接或 base64 data URL
static IMAGE_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://\S+|/\S+|data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/=]+)$")
        .expect("image source pattern")
});

// ==================== 教程 ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "up" | "arriba" => Some(MoveDirection::Up),
            "down" | "abajo" => Some(MoveDirection::Down),
            _ => None,
        }
    }
}

pub fn sort_tutorials(tutorials: &mut [Tutorial]) {
    tutorials.sort_by_key(|t| t.order);
}

/// 按 order 排好序的教程列表
pub async fn list_tutorials(api: &ApiClient) -> Result<Vec<Tutorial>, ApiError> {
    let mut tutorials = api.list_tutorials().await.map_err(|e| {
        log::error!("Error fetching tutorials: {}", e);
        e
    })?;
    sort_tutorials(&mut tutorials);
    Ok(tutorials)
}

/// 与相邻教程交换并把 order 重新编号为下标；首项上移、末项下移返回 None
pub fn reorder(tutorials: &[Tutorial], id: &str, direction: MoveDirection) -> Option<Vec<Tutorial>> {
    let index = tutorials.iter().position(|t| t.id == id)?;
    let target = match direction {
        MoveDirection::Up => index.checked_sub(1)?,
        MoveDirection::Down => index + 1,
    };
    if target >= tutorials.len() {
        return None;
    }

    let mut reordered = tutorials.to_vec();
    reordered.swap(index, target);
    for (i, tutorial) in reordered.iter_mut().enumerate() {
        tutorial.order = i as i64;
    }
    Some(reordered)
}

/// 移动教程，所有 PATCH 都成功后才替换本地顺序；返回是否发生了移动
pub async fn move_tutorial(
    api: &ApiClient,
    tutorials: &mut Vec<Tutorial>,
    id: &str,
    direction: MoveDirection,
) -> Result<bool, ApiError> {
    let Some(reordered) = reorder(tutorials, id, direction) else {
        return Ok(false);
    };

    let payloads: Vec<(String, TutorialPayload)> = reordered
        .iter()
        .map(|t| {
            (
                t.id.clone(),
                TutorialPayload {
                    order: Some(t.order),
                    ..Default::default()
                },
            )
        })
        .collect();

    try_join_all(
        payloads
            .iter()
            .map(|(id, payload)| api.update_tutorial(id, payload)),
    )
    .await
    .map_err(|e| {
        log::error!("Error updating tutorial order: {}", e);
        e
    })?;

    *tutorials = reordered;
    Ok(true)
}

/// 教程表单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorialForm {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

impl TutorialForm {
    pub fn from_tutorial(tutorial: &Tutorial) -> Self {
        Self {
            title: tutorial.title.clone(),
            content: tutorial.content.clone(),
            category: tutorial.category.clone(),
        }
    }

    pub fn validate(&self) -> Result<TutorialPayload, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Required("título"));
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::Required("contenido"));
        }
        Ok(TutorialPayload {
            title: Some(self.title.trim().to_string()),
            content: Some(self.content.clone()),
            category: self
                .category
                .as_ref()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            order: None,
        })
    }
}

// ==================== 练习 ====================

/// 练习表单，新增与编辑共用
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseForm {
    pub problem: String,
    pub level: Option<u8>,
    pub category: String,
    pub images: Vec<String>,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
    pub explanation: String,
}

impl ExerciseForm {
    /// 编辑时用已有练习填充
    pub fn from_exercise(exercise: &Exercise) -> Self {
        Self {
            problem: exercise.problem.clone(),
            level: Some(exercise.level.into()),
            category: exercise.category.id().to_string(),
            images: exercise.images.clone(),
            correct_answer: exercise.answers.correct.clone(),
            incorrect_answers: exercise.answers.incorrect.clone(),
            explanation: exercise.explanation.clone(),
        }
    }

    pub fn add_image(&mut self, src: &str) -> Result<(), ValidationError> {
        if self.images.len() >= MAX_IMAGES {
            return Err(ValidationError::TooManyImages);
        }
        let src = src.trim();
        if !IMAGE_SRC.is_match(src) {
            return Err(ValidationError::InvalidImage(src.to_string()));
        }
        self.images.push(src.to_string());
        Ok(())
    }

    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    /// 校验并生成请求体；空白的错误答案被丢弃
    pub fn validate(&self) -> Result<ExercisePayload, ValidationError> {
        let problem = required(&self.problem, "enunciado")?;
        let level = self.level.ok_or(ValidationError::Required("nivel"))?;
        let level = Difficulty::try_from(level).map_err(|_| ValidationError::InvalidLevel(level))?;
        let category = required(&self.category, "categoría")?;
        let correct_answer = required(&self.correct_answer, "respuesta correcta")?;
        let explanation = required(&self.explanation, "explicación")?;

        let incorrect_answers: Vec<String> = self
            .incorrect_answers
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        if incorrect_answers.is_empty() {
            return Err(ValidationError::NoIncorrectAnswers);
        }
        if incorrect_answers.len() > MAX_INCORRECT_ANSWERS {
            return Err(ValidationError::TooManyIncorrectAnswers {
                max: MAX_INCORRECT_ANSWERS,
            });
        }

        if self.images.len() > MAX_IMAGES {
            return Err(ValidationError::TooManyImages);
        }
        if let Some(bad) = self.images.iter().find(|src| !IMAGE_SRC.is_match(src)) {
            return Err(ValidationError::InvalidImage(bad.clone()));
        }

        Ok(ExercisePayload {
            problem,
            level,
            category,
            images: self.images.clone(),
            correct_answer,
            incorrect_answers,
            explanation,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// 练习顺序一览的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseOrderRow {
    pub exercise_id: String,
    pub category: String,
    pub level: Difficulty,
    pub order: i64,
    pub problem: String,
}

/// 按分类名、难度、order 排列
pub fn exercises_order(exercises: &[Exercise], categories: &[Category]) -> Vec<ExerciseOrderRow> {
    let mut rows: Vec<ExerciseOrderRow> = exercises
        .iter()
        .map(|e| {
            let category = e
                .category
                .name()
                .map(str::to_string)
                .or_else(|| {
                    categories
                        .iter()
                        .find(|c| c.id == e.category.id())
                        .map(|c| c.name.clone())
                })
                .unwrap_or_else(|| "Categoría no encontrada".to_string());
            ExerciseOrderRow {
                exercise_id: e.id.clone(),
                category,
                level: e.level,
                order: e.order,
                problem: e.problem.clone(),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(u8::from(a.level).cmp(&u8::from(b.level)))
            .then(a.order.cmp(&b.order))
    });
    rows
}

// ==================== 分类 ====================

pub fn filter_by_type(categories: &[Category], category_type: CategoryType) -> Vec<&Category> {
    categories
        .iter()
        .filter(|c| c.category_type == category_type)
        .collect()
}

pub async fn create_category(
    api: &ApiClient,
    name: &str,
    category_type: CategoryType,
) -> anyhow::Result<()> {
    let name = required(name, "nombre")?;
    api.create_category(&CategoryPayload {
        name: Some(name),
        category_type: Some(category_type),
    })
    .await?;
    Ok(())
}

pub async fn rename_category(api: &ApiClient, id: &str, name: &str) -> anyhow::Result<()> {
    let name = required(name, "nombre")?;
    api.update_category(
        id,
        &CategoryPayload {
            name: Some(name),
            category_type: None,
        },
    )
    .await?;
    Ok(())
}

/// 有关联内容时返回 `ApiError::CategoryInUse`，本地列表不变
pub async fn delete_category(
    api: &ApiClient,
    categories: &mut Vec<Category>,
    id: &str,
) -> Result<(), ApiError> {
    api.delete_category(id).await.map_err(|e| {
        log::error!("Error deleting category {}: {}", id, e);
        e
    })?;
    categories.retain(|c| c.id != id);
    Ok(())
}
