use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CartAdd {
    Added,
    AlreadyInCart,
}

/// Movie ids pending purchase, in the order they were added. Each id appears
/// at most once.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<i32>,
}

impl Cart {
    pub fn add_item(&mut self, movie_id: i32) -> CartAdd {
        if self.items.contains(&movie_id) {
            return CartAdd::AlreadyInCart;
        }
        self.items.push(movie_id);
        CartAdd::Added
    }

    pub fn remove_item(&mut self, movie_id: i32) -> bool {
        let before = self.items.len();
        self.items.retain(|&id| id != movie_id);
        self.items.len() != before
    }

    /// Buy-now: the cart becomes exactly this one movie.
    pub fn replace_with(&mut self, movie_id: i32) {
        self.items.clear();
        self.items.push(movie_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn retain_only(&mut self, keep: impl Fn(i32) -> bool) {
        self.items.retain(|&id| keep(id));
    }

    pub fn contains(&self, movie_id: i32) -> bool {
        self.items.contains(&movie_id)
    }

    pub fn ids(&self) -> &[i32] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_insertion_order_and_collapses_duplicates() {
        let mut cart = Cart::default();
        assert_eq!(cart.add_item(3), CartAdd::Added);
        assert_eq!(cart.add_item(1), CartAdd::Added);
        assert_eq!(cart.add_item(3), CartAdd::AlreadyInCart);
        assert_eq!(cart.ids(), &[3, 1]);
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn replace_with_discards_previous_contents() {
        let mut cart = Cart::default();
        cart.add_item(1);
        cart.add_item(2);
        cart.replace_with(9);
        assert_eq!(cart.ids(), &[9]);
    }

    #[test]
    fn remove_and_clear() {
        let mut cart = Cart::default();
        cart.add_item(1);
        cart.add_item(2);
        assert!(cart.remove_item(1));
        assert!(!cart.remove_item(1));
        assert_eq!(cart.ids(), &[2]);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn serializes_as_plain_id_list() {
        let mut cart = Cart::default();
        cart.add_item(4);
        cart.add_item(7);
        assert_eq!(serde_json::to_string(&cart).unwrap(), "[4,7]");
        let back: Cart = serde_json::from_str("[4,7]").unwrap();
        assert_eq!(back, cart);
    }
}
