// Bidirectional cursor over an immutable, already-decoded record sequence.
//
// `position` counts records consumed by forward navigation; `remaining` and
// `spent` partition the sequence around it.

#[derive(Clone, Debug, PartialEq)]
pub struct Cursor<T> {
    items: Vec<T>,
    position: usize,
}

impl<T> Cursor<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of records consumed by `next` and not yet given back by `previous`.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn has_next(&self) -> bool {
        self.position < self.items.len()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&T> {
        let item = self.items.get(self.position)?;
        self.position += 1;
        Some(item)
    }

    pub fn has_previous(&self) -> bool {
        self.position > 0
    }

    pub fn previous(&mut self) -> Option<&T> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.items.get(self.position)
    }

    /// Records not yet consumed, in file order.
    pub fn remaining(&self) -> &[T] {
        &self.items[self.position..]
    }

    /// Records already consumed, most recently consumed first.
    pub fn spent(&self) -> Vec<&T> {
        self.items[..self.position].iter().rev().collect()
    }

    /// Every record in file order; the position is left untouched.
    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for Cursor<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

#[cfg(test)]
mod tests {
    use super::Cursor;

    #[test]
    fn fresh_cursor_is_at_start() {
        let cursor = Cursor::new(vec![1, 2, 3]);
        assert!(cursor.has_next());
        assert!(!cursor.has_previous());
        assert_eq!(cursor.remaining(), &[1, 2, 3]);
        assert!(cursor.spent().is_empty());
    }

    #[test]
    fn empty_cursor_has_nothing_either_way() {
        let mut cursor: Cursor<u8> = Cursor::new(Vec::new());
        assert!(!cursor.has_next());
        assert!(!cursor.has_previous());
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.previous(), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn previous_walks_back_in_reverse_order() {
        let mut cursor = Cursor::new(vec!["a", "b", "c"]);
        while cursor.next().is_some() {}
        assert!(!cursor.has_next());
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.position(), 3);

        let mut back = Vec::new();
        while let Some(item) = cursor.previous() {
            back.push(*item);
        }
        assert_eq!(back, vec!["c", "b", "a"]);
        assert!(!cursor.has_previous());
        assert!(cursor.has_next());
    }

    #[test]
    fn spent_is_most_recent_first() {
        let mut cursor = Cursor::new(vec![10, 20, 30, 40]);
        cursor.next();
        cursor.next();
        cursor.next();
        assert_eq!(cursor.spent(), vec![&30, &20, &10]);
        assert_eq!(cursor.remaining(), &[40]);

        cursor.previous();
        assert_eq!(cursor.spent(), vec![&20, &10]);
        assert_eq!(cursor.remaining(), &[30, 40]);
    }

    #[test]
    fn all_ignores_position() {
        let mut cursor = Cursor::new(vec![1, 2, 3]);
        cursor.next();
        cursor.next();
        cursor.previous();
        assert_eq!(cursor.all(), &[1, 2, 3]);
        assert_eq!(cursor.position(), 1);
        cursor.rewind();
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.into_inner(), vec![1, 2, 3]);
    }
}
