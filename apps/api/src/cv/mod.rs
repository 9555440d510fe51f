// Résumé text structuring: heuristic section labelling ahead of analysis.

pub mod structurer;
