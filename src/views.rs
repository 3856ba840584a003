use ndarray::ArrayViewMutD;

/// The carved, named views of one layer's flat parameter (or gradient)
/// vector.
///
/// Every view aliases a disjoint interval of the underlying buffer; the
/// map is fully populated when it is handed out and never mutated
/// afterwards. Iteration follows the layout plan's buffer order.
#[derive(Debug)]
pub struct NamedViews<'a> {
    entries: Vec<(&'static str, ArrayViewMutD<'a, f32>)>,
}

impl<'a> NamedViews<'a> {
    pub(crate) fn new(entries: Vec<(&'static str, ArrayViewMutD<'a, f32>)>) -> Self {
        Self { entries }
    }

    /// Looks up a view by its parameter key.
    pub fn get(&self, name: &str) -> Option<&ArrayViewMutD<'a, f32>> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, view)| view)
    }

    /// Looks up a view by its parameter key, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ArrayViewMutD<'a, f32>> {
        self.entries
            .iter_mut()
            .find(|(key, _)| *key == name)
            .map(|(_, view)| view)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The parameter keys in buffer order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ArrayViewMutD<'a, f32>)> + '_ {
        self.entries.iter().map(|(key, view)| (*key, view))
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (&'static str, &mut ArrayViewMutD<'a, f32>)> + '_ {
        self.entries.iter_mut().map(|(key, view)| (*key, view))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
