use crate::entities::CacheEntity;
use crate::line_size::LineSize;
use std::fmt;

/// One discovered cache level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLevel {
    pub entity: CacheEntity,
    pub line_size: LineSize,
}

/// Discovered hierarchy, smallest level first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheReport {
    levels: Vec<CacheLevel>,
}

impl CacheReport {
    /// Pair each entity with its line size; both lists come from the same pipeline run and have
    /// equal length
    pub fn new(entities: Vec<CacheEntity>, line_sizes: Vec<LineSize>) -> Self {
        debug_assert_eq!(entities.len(), line_sizes.len());
        let levels = entities
            .into_iter()
            .zip(line_sizes)
            .map(|(entity, line_size)| CacheLevel { entity, line_size })
            .collect();
        CacheReport { levels }
    }

    pub fn levels(&self) -> &[CacheLevel] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, level) in self.levels.iter().enumerate() {
            write!(
                f,
                "L{} cache size: {}, assoc: {}, cache line: ",
                k + 1,
                level.entity.size,
                level.entity.associativity
            )?;
            match level.line_size.bytes() {
                Some(bytes) => writeln!(f, "{}", bytes)?,
                None => writeln!(f, "unknown")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_level() {
        let report = CacheReport::new(
            vec![
                CacheEntity {
                    size: 32768,
                    associativity: 8,
                },
                CacheEntity {
                    size: 262144,
                    associativity: 4,
                },
            ],
            vec![LineSize::new(vec![64, 128]), LineSize::default()],
        );

        assert_eq!(
            report.to_string(),
            "L1 cache size: 32768, assoc: 8, cache line: 64\n\
             L2 cache size: 262144, assoc: 4, cache line: unknown\n"
        );
    }

    #[test]
    fn empty_report_prints_nothing() {
        let report = CacheReport::new(Vec::new(), Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "");
    }
}
