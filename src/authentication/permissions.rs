use crate::{
    error::{Error, HtmlError},
    jwt::SessionData,
    schema::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRole {
    Anonymous,
    User,
    Admin,
}

impl CallerRole {
    pub fn of(session: Option<&SessionData>) -> Self {
        match session {
            None => CallerRole::Anonymous,
            Some(session) if session.is_admin => CallerRole::Admin,
            Some(_) => CallerRole::User,
        }
    }

    pub fn can(&self, action: ActionType) -> bool {
        ACTION_TABLE
            .iter()
            .find(|(role, _)| role == self)
            .map(|(_, actions)| actions.contains(&action))
            .unwrap_or(false)
    }
}

const ACTION_TABLE: &[(CallerRole, &[ActionType])] = &[
    (
        CallerRole::Anonymous,
        &[
            ActionType::ReadCatalog,
            ActionType::ReadRecipes,
            ActionType::ListUsers,
            ActionType::RegisterUsers,
        ],
    ),
    (
        CallerRole::User,
        &[
            ActionType::ReadCatalog,
            ActionType::ReadRecipes,
            ActionType::ListUsers,
            ActionType::RegisterUsers,
            ActionType::ViewProfiles,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
        ],
    ),
    (
        CallerRole::Admin,
        &[
            ActionType::ReadCatalog,
            ActionType::ReadRecipes,
            ActionType::ListUsers,
            ActionType::RegisterUsers,
            ActionType::ViewProfiles,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageCatalog,
            ActionType::ManageAllRecipes,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    /// Tags and ingredients, read only.
    ReadCatalog,
    ReadRecipes,
    ListUsers,
    RegisterUsers,

    ViewProfiles,
    CreateRecipes,
    ManageOwnRecipes,
    /// Favorites, shopping cart, subscriptions and the caller's own profile.
    ManageOwnLists,

    ManageCatalog,
    ManageAllRecipes,
    ManageUsers,
}

/// What an action is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Any,
    OwnedBy(Uuid),
}

/// Decides whether `session` may perform `action` on `target`. Anonymous
/// callers are refused with 401, known callers with 403.
pub fn authorize(
    session: Option<&SessionData>,
    action: ActionType,
    target: Target,
) -> Result<(), Error> {
    let role = CallerRole::of(session);

    let allowed = match (action, target) {
        (ActionType::ManageOwnRecipes, Target::OwnedBy(owner)) => {
            role.can(ActionType::ManageAllRecipes)
                || (role.can(ActionType::ManageOwnRecipes)
                    && session.map(|s| s.user_id) == Some(owner))
        }
        (action, _) => role.can(action),
    };

    if allowed {
        return Ok(());
    }

    match session {
        None => Err(HtmlError::Unauthorized.default()),
        Some(_) => Err(HtmlError::Forbidden.default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: Uuid, is_admin: bool) -> SessionData {
        SessionData {
            user_id,
            username: format!("user{user_id}"),
            is_admin,
            token_id: "t".to_string(),
        }
    }

    #[test]
    fn reads_are_open() {
        for action in [
            ActionType::ReadCatalog,
            ActionType::ReadRecipes,
            ActionType::ListUsers,
            ActionType::RegisterUsers,
        ] {
            assert!(authorize(None, action, Target::Any).is_ok());
        }
    }

    #[test]
    fn catalog_mutation_needs_admin() {
        let err = authorize(None, ActionType::ManageCatalog, Target::Any).unwrap_err();
        assert_eq!(err.code, 401);

        let user = session(1, false);
        let err = authorize(Some(&user), ActionType::ManageCatalog, Target::Any).unwrap_err();
        assert_eq!(err.code, 403);

        let admin = session(2, true);
        assert!(authorize(Some(&admin), ActionType::ManageCatalog, Target::Any).is_ok());
    }

    #[test]
    fn recipes_are_managed_by_author_or_admin() {
        let author = session(1, false);
        let stranger = session(2, false);
        let admin = session(3, true);
        let target = Target::OwnedBy(1);

        assert!(authorize(Some(&author), ActionType::ManageOwnRecipes, target).is_ok());
        assert!(authorize(Some(&admin), ActionType::ManageOwnRecipes, target).is_ok());
        assert_eq!(
            authorize(Some(&stranger), ActionType::ManageOwnRecipes, target)
                .unwrap_err()
                .code,
            403
        );
        assert_eq!(
            authorize(None, ActionType::ManageOwnRecipes, target)
                .unwrap_err()
                .code,
            401
        );
    }

    #[test]
    fn creation_and_lists_need_identity() {
        assert!(authorize(None, ActionType::CreateRecipes, Target::Any).is_err());
        assert!(authorize(None, ActionType::ManageOwnLists, Target::Any).is_err());
        assert!(session(1, false)
            .authenticate(ActionType::CreateRecipes)
            .is_ok());
    }

    #[test]
    fn only_admins_delete_users() {
        assert!(session(1, false)
            .authenticate(ActionType::ManageUsers)
            .is_err());
        assert!(session(1, true).authenticate(ActionType::ManageUsers).is_ok());
    }
}
