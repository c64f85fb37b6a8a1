//! A player seat in a session.

use impostor_protocol::{PlayerId, PrivateInfo, PublicPlayer, Role};

/// One player: identity plus the per-game flags the state machine reads.
///
/// `role` and `word` are assigned exactly once, at game start. The turn
/// and vote flags are only touched by [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub word: Option<String>,
    pub has_given_clue: bool,
    pub has_voted: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: None,
            word: None,
            has_given_clue: false,
            has_voted: false,
        }
    }

    /// Hands this player their role and word.
    pub(crate) fn assign(&mut self, role: Role, word: &str) {
        debug_assert!(self.role.is_none(), "role assigned twice");
        self.role = Some(role);
        self.word = Some(word.to_string());
    }

    pub fn is_impostor(&self) -> bool {
        self.role == Some(Role::Impostor)
    }

    /// The roster entry everyone may see.
    pub fn public(&self) -> PublicPlayer {
        PublicPlayer {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// This player's secret, once one has been dealt.
    pub fn private_info(&self) -> Option<PrivateInfo> {
        match (&self.word, self.role) {
            (Some(word), Some(role)) => Some(PrivateInfo {
                word: word.clone(),
                role,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_has_no_secret() {
        let p = Player::new(PlayerId::from("a"), "Ana");
        assert!(p.private_info().is_none());
        assert!(!p.is_impostor());
        assert!(!p.has_given_clue);
        assert!(!p.has_voted);
    }

    #[test]
    fn test_assign_sets_private_info() {
        let mut p = Player::new(PlayerId::from("a"), "Ana");
        p.assign(Role::Impostor, "Tea");
        assert!(p.is_impostor());
        assert_eq!(
            p.private_info(),
            Some(PrivateInfo {
                word: "Tea".into(),
                role: Role::Impostor,
            })
        );
    }

    #[test]
    fn test_public_view_has_only_id_and_name() {
        let p = Player::new(PlayerId::from("a"), "Ana");
        let public = p.public();
        assert_eq!(public.id, PlayerId::from("a"));
        assert_eq!(public.name, "Ana");
    }
}
