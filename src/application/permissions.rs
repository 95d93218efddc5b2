//! # Permission Gate
//!
//! Evaluates a command's declared restrictions against the invocation context.
//! Each restriction is its own guard with its own denial text.

use crate::application::context::InvocationContext;
use crate::domain::command::Restrictions;
use crate::strings::messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    GroupOnly,
    AdminOnly,
    OwnerOnly,
    BotNotAdmin,
}

impl Denial {
    pub fn message(&self) -> &'static str {
        match self {
            Denial::GroupOnly => messages::GROUP_ONLY,
            Denial::AdminOnly => messages::ADMIN_ONLY,
            Denial::OwnerOnly => messages::OWNER_ONLY,
            Denial::BotNotAdmin => messages::BOT_ADMIN_REQUIRED,
        }
    }
}

/// The facts a restriction is judged against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standing {
    pub is_group: bool,
    pub is_admin: bool,
    pub is_owner: bool,
    pub is_bot_admin: bool,
}

impl From<&InvocationContext<'_>> for Standing {
    fn from(ctx: &InvocationContext<'_>) -> Self {
        Self {
            is_group: ctx.is_group,
            is_admin: ctx.is_admin,
            is_owner: ctx.is_owner,
            is_bot_admin: ctx.is_bot_admin,
        }
    }
}

/// First violated restriction, in order: group, admin, owner, bot admin.
pub fn authorize(restrictions: &Restrictions, standing: Standing) -> Result<(), Denial> {
    if restrictions.group_only && !standing.is_group {
        return Err(Denial::GroupOnly);
    }
    if restrictions.admin_only && !standing.is_admin {
        return Err(Denial::AdminOnly);
    }
    if restrictions.owner_only && !standing.is_owner {
        return Err(Denial::OwnerOnly);
    }
    if restrictions.bot_admin && !standing.is_bot_admin {
        return Err(Denial::BotNotAdmin);
    }
    Ok(())
}
