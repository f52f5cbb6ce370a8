/// Classification of one letter of a guess against the target word.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Grade {
    /// Same letter in the same position.
    Exact,
    /// Letter occurs somewhere else in the target.
    Present,
    Absent,
}

/// Grades every position of `guess` against `target`.
///
/// A letter counts as `Present` whenever it occurs anywhere in the target,
/// without consuming occurrences, so repeated letters may all be marked.
pub fn grade(guess: &str, target: &str) -> Vec<Grade> {
    let target: Vec<char> = target.chars().collect();
    guess
        .chars()
        .enumerate()
        .map(|(idx, letter)| {
            if target.get(idx) == Some(&letter) {
                Grade::Exact
            } else if target.contains(&letter) {
                Grade::Present
            } else {
                Grade::Absent
            }
        })
        .collect()
}
