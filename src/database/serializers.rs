//! Read and write shapes of the API.
//!
//! Rows flow out through the `*View` types, which merge in facts relative to
//! the requesting user. Input flows in through [`RecipePayload`], which is
//! validated and then resolved against the stored recipe into a
//! [`RecipeDraft`] before anything is persisted.

use std::{
    collections::{HashMap, HashSet},
    sync::OnceLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        EMAIL_MAX_LENGTH, HEX_COLOR_PATTERN, INGREDIENT_FIELD_MAX_LENGTH, PASSWORD_MIN_LENGTH,
        RECIPE_NAME_MAX_LENGTH, TAG_FIELD_MAX_LENGTH, USERNAME_PATTERN, USER_NAME_MAX_LENGTH,
    },
    error::{Error, HtmlError},
    media::MediaStore,
    schema::{Ingredient, Recipe, RecipePart, Tag, UserRow, Uuid},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn from_row(row: UserRow, is_subscribed: bool) -> Self {
        Self {
            email: row.email,
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeIngredientView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for RecipeIngredientView {
    fn from(value: RecipePart) -> Self {
        Self {
            id: value.ingredient_id,
            name: value.name,
            measurement_unit: value.measurement_unit,
            amount: value.amount,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Short form used by favorite/cart responses and subscriptions.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeBrief {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeBrief {
    pub fn from_recipe(recipe: &Recipe, media: &MediaStore) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: media.url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeBrief>,
    pub recipes_count: i64,
}

impl SubscriptionView {
    /// Subscriptions only exist while active, so the flag is always set.
    pub fn new(author: UserRow, recipes: Vec<RecipeBrief>, recipes_count: i64) -> Self {
        Self {
            author: UserView::from_row(author, true),
            recipes,
            recipes_count,
        }
    }
}

/// Everything needed to render a batch of recipes for one caller.
#[derive(Debug, Default)]
pub struct RecipeRelations {
    pub parts: HashMap<Uuid, Vec<RecipePart>>,
    pub tags: HashMap<Uuid, Vec<Tag>>,
    pub authors: HashMap<Uuid, UserRow>,
    pub favorited: HashSet<Uuid>,
    pub in_cart: HashSet<Uuid>,
    pub subscribed: HashSet<Uuid>,
}

impl RecipeRelations {
    pub fn to_view(&self, recipe: Recipe, media: &MediaStore) -> Result<RecipeView, Error> {
        let author = self.authors.get(&recipe.author_id).cloned().ok_or_else(|| {
            log::error!("Author {} of recipe {} not loaded", recipe.author_id, recipe.id);
            HtmlError::InternalServerError.default()
        })?;

        Ok(RecipeView {
            id: recipe.id,
            tags: self.tags.get(&recipe.id).cloned().unwrap_or_default(),
            author: UserView::from_row(author, self.subscribed.contains(&recipe.author_id)),
            ingredients: self
                .parts
                .get(&recipe.id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(RecipeIngredientView::from)
                .collect(),
            is_favorited: self.favorited.contains(&recipe.id),
            is_in_shopping_cart: self.in_cart.contains(&recipe.id),
            image: media.url(&recipe.image),
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Write shape of a recipe. Every field is optional so the same type serves
/// create (all required) and partial update.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipePayload {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Uuid>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

fn invalid(info: &str) -> Error {
    HtmlError::InvalidRequest.new(info)
}

impl RecipePayload {
    pub fn validate(&self, mode: WriteMode) -> Result<(), Error> {
        if mode == WriteMode::Create {
            let missing = [
                ("ingredients", self.ingredients.is_none()),
                ("tags", self.tags.is_none()),
                ("image", self.image.is_none()),
                ("name", self.name.is_none()),
                ("text", self.text.is_none()),
                ("cooking_time", self.cooking_time.is_none()),
            ]
            .into_iter()
            .find_map(|(field, missing)| missing.then_some(field));

            if let Some(field) = missing {
                return Err(invalid(&format!("Field '{field}' is required")));
            }
            if self.ingredients.as_ref().is_some_and(|i| i.is_empty()) {
                return Err(invalid("A recipe needs at least one ingredient"));
            }
        }

        if let Some(ingredients) = &self.ingredients {
            let mut unique_ingredients = HashSet::new();
            for ingredient in ingredients {
                if !unique_ingredients.insert(ingredient.id) {
                    return Err(invalid(
                        "Ingredient can't be included in a recipe multiple times",
                    ));
                }
                if ingredient.amount < 1 {
                    return Err(invalid("Amount must be at least 1"));
                }
            }
        }

        if let Some(tags) = &self.tags {
            let unique_tags: HashSet<&Uuid> = tags.iter().collect();
            if unique_tags.len() != tags.len() {
                return Err(invalid("Tag can't be included in a recipe multiple times"));
            }
        }

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(invalid("Name can't be empty"));
            }
            if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
                return Err(invalid(&format!(
                    "Name can't be longer than {RECIPE_NAME_MAX_LENGTH} characters"
                )));
            }
        }

        if self.text.as_ref().is_some_and(|t| t.trim().is_empty()) {
            return Err(invalid("Text can't be empty"));
        }

        if self.cooking_time.is_some_and(|t| t < 1) {
            return Err(invalid("Cooking time must be at least 1"));
        }

        Ok(())
    }

    /// Resolves the payload into the full set of values to store. Scalars
    /// omitted from an update keep their stored value; association lists
    /// always replace what was stored.
    pub fn into_draft(
        self,
        existing: Option<&Recipe>,
        image: Option<String>,
    ) -> Result<RecipeDraft, Error> {
        let name = self
            .name
            .or_else(|| existing.map(|r| r.name.to_owned()))
            .ok_or_else(|| invalid("Field 'name' is required"))?;
        let text = self
            .text
            .or_else(|| existing.map(|r| r.text.to_owned()))
            .ok_or_else(|| invalid("Field 'text' is required"))?;
        let image = image
            .or_else(|| existing.map(|r| r.image.to_owned()))
            .ok_or_else(|| invalid("Field 'image' is required"))?;
        let cooking_time = self
            .cooking_time
            .or_else(|| existing.map(|r| r.cooking_time))
            .ok_or_else(|| invalid("Field 'cooking_time' is required"))?;

        Ok(RecipeDraft {
            name,
            text,
            image,
            cooking_time,
            ingredients: self.ingredients.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
        })
    }
}

/// Validated recipe ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

fn pattern_matches(
    pattern: &'static str,
    cell: &'static OnceLock<Option<Regex>>,
    value: &str,
) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

pub fn is_hex_color(value: &str) -> bool {
    static HEX_COLOR: OnceLock<Option<Regex>> = OnceLock::new();
    pattern_matches(HEX_COLOR_PATTERN, &HEX_COLOR, value)
}

fn is_username(value: &str) -> bool {
    static USERNAME: OnceLock<Option<Regex>> = OnceLock::new();
    pattern_matches(USERNAME_PATTERN, &USERNAME, value)
}

fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_text(field: &str, value: &str, max_length: usize) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(invalid(&format!("Field '{field}' can't be empty")));
    }
    if value.chars().count() > max_length {
        return Err(invalid(&format!(
            "Field '{field}' can't be longer than {max_length} characters"
        )));
    }
    Ok(())
}

/// Registration form.
#[derive(Deserialize, Debug, Clone)]
pub struct UserPayload {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl UserPayload {
    pub fn validate(&self) -> Result<(), Error> {
        check_text("email", &self.email, EMAIL_MAX_LENGTH)?;
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(invalid("Enter a valid email address")),
        }
        check_text("username", &self.username, USER_NAME_MAX_LENGTH)?;
        if !is_username(&self.username) {
            return Err(invalid(
                "Username may contain only letters, digits and @/./+/-/_ characters",
            ));
        }
        check_text("first_name", &self.first_name, USER_NAME_MAX_LENGTH)?;
        check_text("last_name", &self.last_name, USER_NAME_MAX_LENGTH)?;
        check_password(&self.password)
    }
}

fn check_password(password: &str) -> Result<(), Error> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(invalid(&format!(
            "Password must be at least {PASSWORD_MIN_LENGTH} characters long"
        )));
    }
    Ok(())
}

#[derive(Deserialize, Debug, Clone)]
pub struct PasswordPayload {
    pub new_password: String,
    pub current_password: String,
}

impl PasswordPayload {
    pub fn validate(&self) -> Result<(), Error> {
        check_password(&self.new_password)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TokenView {
    pub auth_token: String,
}

/// Tag create/update form. Omitted fields keep their stored value on update.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct TagPayload {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

impl TagPayload {
    pub fn validate(&self, mode: WriteMode) -> Result<(), Error> {
        if mode == WriteMode::Create && (self.name.is_none() || self.color.is_none() || self.slug.is_none()) {
            return Err(invalid("Fields 'name', 'color' and 'slug' are required"));
        }
        if let Some(name) = &self.name {
            check_text("name", name, TAG_FIELD_MAX_LENGTH)?;
        }
        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                return Err(invalid("Invalid HEX color"));
            }
        }
        if let Some(slug) = &self.slug {
            check_text("slug", slug, TAG_FIELD_MAX_LENGTH)?;
            if !is_slug(slug) {
                return Err(invalid(
                    "Slug may contain only latin letters, digits, hyphens and underscores",
                ));
            }
        }
        Ok(())
    }

    pub fn into_tag(self, existing: Option<Tag>) -> Result<Tag, Error> {
        let (id, name, color, slug) = match existing {
            Some(tag) => (tag.id, Some(tag.name), Some(tag.color), Some(tag.slug)),
            None => (0, None, None, None),
        };

        Ok(Tag {
            id,
            name: self.name.or(name).ok_or_else(|| invalid("Field 'name' is required"))?,
            color: self
                .color
                .or(color)
                .ok_or_else(|| invalid("Field 'color' is required"))?,
            slug: self.slug.or(slug).ok_or_else(|| invalid("Field 'slug' is required"))?,
        })
    }
}

/// Ingredient create/update form, also the record format of catalog files.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct IngredientPayload {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

impl IngredientPayload {
    pub fn validate(&self, mode: WriteMode) -> Result<(), Error> {
        if mode == WriteMode::Create && (self.name.is_none() || self.measurement_unit.is_none()) {
            return Err(invalid("Fields 'name' and 'measurement_unit' are required"));
        }
        if let Some(name) = &self.name {
            check_text("name", name, INGREDIENT_FIELD_MAX_LENGTH)?;
        }
        if let Some(unit) = &self.measurement_unit {
            check_text("measurement_unit", unit, INGREDIENT_FIELD_MAX_LENGTH)?;
        }
        Ok(())
    }

    pub fn into_ingredient(self, existing: Option<Ingredient>) -> Result<Ingredient, Error> {
        let (id, name, unit) = match existing {
            Some(ingredient) => (
                ingredient.id,
                Some(ingredient.name),
                Some(ingredient.measurement_unit),
            ),
            None => (0, None, None),
        };

        Ok(Ingredient {
            id,
            name: self.name.or(name).ok_or_else(|| invalid("Field 'name' is required"))?,
            measurement_unit: self
                .measurement_unit
                .or(unit)
                .ok_or_else(|| invalid("Field 'measurement_unit' is required"))?,
        })
    }
}
