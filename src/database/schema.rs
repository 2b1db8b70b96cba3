use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Uuid = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// A user is an admin through the role column or either escalation flag.
pub fn is_admin(role: UserRole, is_superuser: bool, is_staff: bool) -> bool {
    role == UserRole::Admin || is_superuser || is_staff
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
    pub is_superuser: bool,
    pub is_staff: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        is_admin(self.role, self.is_superuser, self.is_staff)
    }
}

/// Public columns of a user, as loaded for listings.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRowPartial {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub count: i64,
}

impl From<UserRowPartial> for UserRow {
    fn from(value: UserRowPartial) -> Self {
        Self {
            id: value.id,
            email: value.email,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Tag joined through `recipe_tags`.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedRecipeTag {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<LinkedRecipeTag> for Tag {
    fn from(value: LinkedRecipeTag) -> Self {
        Self {
            id: value.id,
            name: value.name,
            color: value.color,
            slug: value.slug,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRowPartial {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
    pub count: i64,
}

impl From<RecipeRowPartial> for Recipe {
    fn from(value: RecipeRowPartial) -> Self {
        Self {
            id: value.id,
            author_id: value.author_id,
            name: value.name,
            text: value.text,
            image: value.image,
            cooking_time: value.cooking_time,
            pub_date: value.pub_date,
        }
    }
}

/// One ingredient line of a recipe with the catalog name and unit merged in.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct RecipePart {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// An ingredient line belonging to a recipe in somebody's cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, is_superuser: bool, is_staff: bool) -> User {
        User {
            id: 1,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Cook".to_string(),
            password: String::new(),
            role,
            is_superuser,
            is_staff,
        }
    }

    #[test]
    fn admin_through_role_or_flags() {
        assert!(!user(UserRole::User, false, false).is_admin());
        assert!(user(UserRole::Admin, false, false).is_admin());
        assert!(user(UserRole::User, true, false).is_admin());
        assert!(user(UserRole::User, false, true).is_admin());
    }
}
