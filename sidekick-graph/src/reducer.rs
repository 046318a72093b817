/// Field reducer that appends the update after the current items.
pub struct AppendVec;
impl AppendVec {
    pub fn merge<T: Clone>(current: &[T], mut update: Vec<T>) -> Vec<T> {
        let mut out = current.to_vec();
        out.append(&mut update);
        out
    }
}

/// Field reducer that replaces the current value when an update is present.
pub struct Override;
impl Override {
    pub fn merge<T: Clone>(current: &T, update: Option<T>) -> T {
        update.unwrap_or_else(|| current.clone())
    }
}
