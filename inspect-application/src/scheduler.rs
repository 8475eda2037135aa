/// Round-robin cursor over the currently available workers.
///
/// The cursor is reduced modulo the size of the slice it is given, so it
/// stays valid while the available set grows and shrinks between calls.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    pub fn pick<'a, T>(&mut self, available: &'a [T]) -> Option<&'a T> {
        if available.is_empty() {
            return None;
        }
        let index = self.cursor % available.len();
        self.cursor = (index + 1) % available.len();
        available.get(index)
    }
}
