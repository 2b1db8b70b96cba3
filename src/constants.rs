pub const PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_FIELD_MAX_LENGTH: usize = 200;
pub const INGREDIENT_FIELD_MAX_LENGTH: usize = 200;
pub const USER_NAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const HEX_COLOR_PATTERN: &str = r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$";
pub const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";

pub const RECIPE_IMAGE_DIR: &str = "recipes";
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

pub const SHOPPING_LIST_HEADER: &str = "SHOPPING LIST:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping-list.txt";

pub const DEV_SECRET: &str = "cookbook-development-secret";
pub const BODY_LIMIT: u64 = 10 * 1024 * 1024;
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
