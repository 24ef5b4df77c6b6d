/// Query access to a projection's current contents.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries, or 0 while a writer holds the view.
    fn count(&self) -> usize;
}
