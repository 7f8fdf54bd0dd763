/// In-memory ordering of item ids, mutated locally and then written back as
/// a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderedIndex {
    ids: Vec<i64>,
}

impl OrderedIndex {
    pub fn new(ids: Vec<i64>) -> Self {
        OrderedIndex { ids }
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position_of(&self, id: i64) -> Option<usize> {
        self.ids.iter().position(|&other| other == id)
    }

    /// Moves `id` to `position`, shifting the items in between. Positions past
    /// the end move the item last. Returns false if `id` is not indexed.
    pub fn move_to(&mut self, id: i64, position: usize) -> bool {
        let Some(current) = self.position_of(id) else {
            return false;
        };
        let item = self.ids.remove(current);
        let target = position.min(self.ids.len());
        self.ids.insert(target, item);
        true
    }

    /// True when `candidate` holds exactly the indexed ids, in any order.
    pub fn is_permutation(&self, candidate: &[i64]) -> bool {
        if candidate.len() != self.ids.len() {
            return false;
        }
        let mut expected = self.ids.clone();
        let mut actual = candidate.to_vec();
        expected.sort_unstable();
        actual.sort_unstable();
        expected == actual
    }
}
