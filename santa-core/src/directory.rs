use rand::Rng;
use tracing::{debug, info};

use crate::assignment::{generate, is_derangement, issue_token};
use crate::{Participant, SantaError};

/// The authoritative roster. Roster order defines the indices stored in
/// `Participant::recipient_index`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantDirectory {
    roster: Vec<Participant>,
}

impl ParticipantDirectory {
    pub fn new(roster: Vec<Participant>) -> Self {
        Self { roster }
    }

    /// Like [`ParticipantDirectory::new`], for rosters read back from disk.
    /// Names must be unique, and every recipient index present must be in
    /// range, point at someone else, and not be shared with another giver.
    /// Missing indices are fine: a roster saved between `add` and the next
    /// reshuffle has them.
    pub fn from_stored(roster: Vec<Participant>) -> Result<Self, String> {
        let n = roster.len();
        let mut taken = vec![false; n];
        for (i, person) in roster.iter().enumerate() {
            if roster[..i].iter().any(|p| p.name == person.name) {
                return Err(format!("duplicate participant {:?}", person.name));
            }
            let Some(recipient) = person.recipient_index else {
                continue;
            };
            if recipient >= n {
                return Err(format!(
                    "{:?} gifts index {recipient}, roster has {n} people",
                    person.name
                ));
            }
            if recipient == i {
                return Err(format!("{:?} is assigned to themselves", person.name));
            }
            if taken[recipient] {
                return Err(format!(
                    "{:?} is the recipient of more than one giver",
                    roster[recipient].name
                ));
            }
            taken[recipient] = true;
        }
        Ok(Self { roster })
    }

    /// Builds a drawn and tokenized roster from bare names.
    pub fn fresh<R, S>(names: &[S], rng: &mut R) -> Result<Self, SantaError>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        let mut directory = Self::default();
        for name in names {
            let name = name.as_ref();
            if directory.position(name).is_ok() {
                return Err(SantaError::NameTaken);
            }
            directory.roster.push(Participant::new(name, 0));
        }
        directory.reshuffle(rng)?;
        for person in directory.roster.iter_mut() {
            person.token = issue_token(rng);
        }
        Ok(directory)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.roster
    }

    pub fn into_roster(self) -> Vec<Participant> {
        self.roster
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn position(&self, name: &str) -> Result<usize, SantaError> {
        self.roster
            .iter()
            .position(|p| p.name == name)
            .ok_or(SantaError::NotFound)
    }

    pub fn find(&self, name: &str) -> Result<&Participant, SantaError> {
        self.position(name).map(|index| &self.roster[index])
    }

    pub(crate) fn get(&self, index: usize) -> &Participant {
        &self.roster[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut Participant {
        &mut self.roster[index]
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Participant, SantaError> {
        self.roster
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or(SantaError::NotFound)
    }

    /// True when every participant has a recipient and together they form a
    /// derangement. Anything else means the stored indices are stale.
    pub fn is_assigned(&self) -> bool {
        let mut permutation = Vec::with_capacity(self.roster.len());
        for person in &self.roster {
            match person.recipient_index {
                Some(index) => permutation.push(index),
                None => return false,
            }
        }
        !permutation.is_empty() && is_derangement(&permutation)
    }

    pub(crate) fn recipient_index_of(&self, index: usize) -> Result<usize, SantaError> {
        if !self.is_assigned() {
            return Err(SantaError::NotAssigned);
        }
        self.roster[index]
            .recipient_index
            .ok_or(SantaError::NotAssigned)
    }

    pub fn recipient_of(&self, name: &str) -> Result<&Participant, SantaError> {
        let index = self.position(name)?;
        let recipient = self.recipient_index_of(index)?;
        Ok(&self.roster[recipient])
    }

    /// Appends an unassigned participant. Nobody can look up a recipient
    /// again until the next reshuffle.
    pub fn add<R: Rng + ?Sized>(&mut self, name: &str, rng: &mut R) -> Result<(), SantaError> {
        if self.position(name).is_ok() {
            return Err(SantaError::NameTaken);
        }
        self.roster.push(Participant::new(name, issue_token(rng)));
        info!(name, "added participant");
        Ok(())
    }

    /// Removes a participant and drops the whole assignment, since indices at
    /// or past the removed slot no longer point where they did.
    pub fn remove(&mut self, name: &str) -> Result<Participant, SantaError> {
        let index = self.position(name)?;
        let removed = self.roster.remove(index);
        for person in self.roster.iter_mut() {
            person.recipient_index = None;
        }
        info!(name, "removed participant, assignment cleared");
        Ok(removed)
    }

    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SantaError> {
        let permutation = generate(self.roster.len(), rng)?;
        self.apply_assignment(&permutation)?;
        debug!(participants = self.roster.len(), "reshuffled");
        Ok(())
    }

    pub fn apply_assignment(&mut self, permutation: &[usize]) -> Result<(), SantaError> {
        if permutation.len() != self.roster.len() || !is_derangement(permutation) {
            return Err(SantaError::InvalidConfiguration(format!(
                "{permutation:?} is not a derangement of {} participants",
                self.roster.len()
            )));
        }
        for (person, &recipient) in self.roster.iter_mut().zip(permutation) {
            person.recipient_index = Some(recipient);
        }
        Ok(())
    }

    /// Reissues every token. Everyone has to reveal again with the new one.
    pub fn reset_tokens<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for person in self.roster.iter_mut() {
            person.token = issue_token(rng);
            person.has_picked = false;
        }
    }

    pub fn unpick(&mut self, name: &str) -> Result<(), SantaError> {
        self.find_mut(name)?.has_picked = false;
        Ok(())
    }

    pub fn unpick_all(&mut self) {
        for person in self.roster.iter_mut() {
            person.has_picked = false;
        }
    }

    pub fn set_wishlist(&mut self, name: &str, text: impl Into<String>) -> Result<(), SantaError> {
        self.find_mut(name)?.wishlist = text.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::seeded_rng;

    fn abc() -> ParticipantDirectory {
        let mut directory = ParticipantDirectory::new(vec![
            Participant::new("A", 1),
            Participant::new("B", 2),
            Participant::new("C", 3),
        ]);
        directory.apply_assignment(&[1, 2, 0]).unwrap();
        directory
    }

    #[test]
    fn recipients_follow_the_assignment() {
        let directory = abc();
        assert_eq!(directory.recipient_of("A").unwrap().name, "B");
        assert_eq!(directory.recipient_of("B").unwrap().name, "C");
        assert_eq!(directory.recipient_of("C").unwrap().name, "A");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let directory = abc();
        assert_eq!(directory.find("a"), Err(SantaError::NotFound));
        assert_eq!(directory.find("A").unwrap().token, 1);
    }

    #[test]
    fn add_invalidates_assignment_until_reshuffle() {
        let mut directory = abc();
        let mut rng = seeded_rng(3);
        directory.add("D", &mut rng).unwrap();

        assert!(!directory.is_assigned());
        assert_eq!(directory.recipient_of("A"), Err(SantaError::NotAssigned));
        assert_eq!(directory.recipient_of("D"), Err(SantaError::NotAssigned));
        assert_ne!(directory.find("D").unwrap().token, 0);

        directory.reshuffle(&mut rng).unwrap();
        assert!(directory.is_assigned());
        assert_ne!(directory.recipient_of("D").unwrap().name, "D");
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut directory = abc();
        assert_eq!(
            directory.add("B", &mut seeded_rng(1)),
            Err(SantaError::NameTaken)
        );
        assert_eq!(directory.len(), 3);
    }

    #[test]
    fn remove_clears_stale_assignment() {
        let mut directory = abc();
        let removed = directory.remove("B").unwrap();
        assert_eq!(removed.name, "B");
        assert_eq!(directory.len(), 2);
        assert!(directory
            .participants()
            .iter()
            .all(|p| p.recipient_index.is_none()));
        assert_eq!(directory.recipient_of("A"), Err(SantaError::NotAssigned));
        assert_eq!(directory.remove("B"), Err(SantaError::NotFound));
    }

    #[test]
    fn reshuffle_keeps_wishlists_and_picks() {
        let mut directory = abc();
        directory.set_wishlist("A", "socks").unwrap();
        directory.get_mut(0).has_picked = true;

        directory.reshuffle(&mut seeded_rng(9)).unwrap();

        let a = directory.find("A").unwrap();
        assert_eq!(a.wishlist, "socks");
        assert!(a.has_picked);
        assert!(directory.is_assigned());
    }

    #[test]
    fn reshuffle_needs_two_people() {
        let mut directory = ParticipantDirectory::new(vec![Participant::new("solo", 1)]);
        assert!(matches!(
            directory.reshuffle(&mut seeded_rng(1)),
            Err(SantaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn apply_assignment_rejects_fixed_points() {
        let mut directory = abc();
        assert!(matches!(
            directory.apply_assignment(&[0, 2, 1]),
            Err(SantaError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            directory.apply_assignment(&[1, 0]),
            Err(SantaError::InvalidConfiguration(_))
        ));
        assert_eq!(directory.recipient_of("A").unwrap().name, "B");
    }

    #[test]
    fn reset_tokens_reissues_and_unpicks() {
        let mut directory = abc();
        directory.get_mut(1).has_picked = true;
        let before: Vec<_> = directory.participants().iter().map(|p| p.token).collect();

        directory.reset_tokens(&mut seeded_rng(5));

        for (person, old) in directory.participants().iter().zip(before) {
            assert_ne!(person.token, old);
            assert!(!person.has_picked);
        }
        assert!(directory.is_assigned());
    }

    #[test]
    fn unpick_touches_only_the_flag() {
        let mut directory = abc();
        directory.get_mut(0).has_picked = true;
        directory.get_mut(2).has_picked = true;

        directory.unpick("A").unwrap();
        assert!(!directory.find("A").unwrap().has_picked);
        assert!(directory.find("C").unwrap().has_picked);
        assert_eq!(directory.unpick("Z"), Err(SantaError::NotFound));

        directory.unpick_all();
        assert!(directory.participants().iter().all(|p| !p.has_picked));
        assert_eq!(directory.find("A").unwrap().token, 1);
    }

    #[test]
    fn set_wishlist_does_not_mark_picked() {
        let mut directory = abc();
        directory.set_wishlist("C", "a scarf").unwrap();
        let c = directory.find("C").unwrap();
        assert_eq!(c.wishlist, "a scarf");
        assert!(!c.has_picked);
    }

    #[test]
    fn fresh_roster_is_drawn_and_tokenized() {
        let names = ["Nawel", "Tobias", "Luca", "Lola"];
        let directory = ParticipantDirectory::fresh(&names, &mut seeded_rng(11)).unwrap();
        assert_eq!(directory.len(), 4);
        assert!(directory.is_assigned());
        assert!(directory.participants().iter().all(|p| p.token != 0));

        let again = ParticipantDirectory::fresh(&names, &mut seeded_rng(11)).unwrap();
        assert_eq!(directory, again);
    }

    fn stored(entries: &[(&str, Option<usize>)]) -> Vec<Participant> {
        entries
            .iter()
            .map(|&(name, recipient_index)| Participant {
                recipient_index,
                ..Participant::new(name, 1)
            })
            .collect()
    }

    #[test]
    fn stored_roster_accepts_drawn_and_pending_states() {
        let drawn = stored(&[("A", Some(1)), ("B", Some(2)), ("C", Some(0))]);
        assert!(ParticipantDirectory::from_stored(drawn).unwrap().is_assigned());

        let added_not_drawn = stored(&[("A", Some(1)), ("B", Some(0)), ("C", None)]);
        assert!(ParticipantDirectory::from_stored(added_not_drawn).is_ok());

        let removed = stored(&[("A", None), ("B", None)]);
        assert!(ParticipantDirectory::from_stored(removed).is_ok());
    }

    #[test]
    fn stored_roster_rejects_inconsistent_records() {
        let inconsistent = [
            stored(&[("A", Some(1)), ("A", Some(0))]),
            stored(&[("A", Some(5)), ("B", Some(0))]),
            stored(&[("A", Some(0)), ("B", None)]),
            stored(&[("A", Some(2)), ("B", Some(2)), ("C", Some(0))]),
        ];
        for roster in inconsistent {
            assert!(ParticipantDirectory::from_stored(roster).is_err());
        }
    }

    #[test]
    fn fresh_rejects_duplicates_and_tiny_rosters() {
        assert_eq!(
            ParticipantDirectory::fresh(&["A", "A"], &mut seeded_rng(1)),
            Err(SantaError::NameTaken)
        );
        assert!(matches!(
            ParticipantDirectory::fresh(&["A"], &mut seeded_rng(1)),
            Err(SantaError::InvalidConfiguration(_))
        ));
    }
}
