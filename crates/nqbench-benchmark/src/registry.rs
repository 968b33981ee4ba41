//! Target registry.
//!
//! The built-in registry describes the five engines of the N-Queens BDD
//! campaign. Configuration files can extend it, override entries by id, or
//! replace it entirely.

use nqbench_config::HarnessConfig;
use nqbench_core::{BuildStep, OutputFormat, Target, WorkerSupport};

use crate::error::HarnessError;
use crate::normalizer::compile_pattern;

const LD_PATH: &str = "LD_LIBRARY_PATH";

/// Validated, ordered set of benchmark targets.
///
/// Ids are unique ignoring ASCII case; lookups ignore case too.
///
/// # Example
///
/// ```
/// use nqbench_benchmark::Registry;
///
/// let registry = Registry::builtin();
/// let targets = registry.resolve(&["sylvan".to_string(), "BuDDy".to_string()]).unwrap();
/// assert_eq!(targets[0].id, "Sylvan");
/// assert_eq!(targets[1].id, "BuDDy");
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    targets: Vec<Target>,
}

impl Registry {
    /// The built-in targets: BuDDy, Sylvan, CUDD, JDD and JSylvan.
    pub fn builtin() -> Self {
        Self {
            targets: vec![buddy(), sylvan(), cudd(), jdd(), jsylvan()],
        }
    }

    /// Builds a registry from explicit targets.
    ///
    /// # Errors
    ///
    /// Fails on an invalid target, a duplicate id or an unusable free-text
    /// pattern.
    pub fn from_targets(targets: Vec<Target>) -> Result<Self, HarnessError> {
        let registry = Self { targets };
        registry.check()?;
        Ok(registry)
    }

    /// Builds the registry a configuration asks for.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, HarnessError> {
        if config.replace_builtin {
            Self::from_targets(config.registry.clone())
        } else {
            Self::builtin().merge(config.registry.clone())
        }
    }

    /// Overrides entries with the same id and appends the rest.
    pub fn merge(mut self, overrides: Vec<Target>) -> Result<Self, HarnessError> {
        for target in overrides {
            match self.position(&target.id) {
                Some(i) => self.targets[i] = target,
                None => self.targets.push(target),
            }
        }
        self.check()?;
        Ok(self)
    }

    fn check(&self) -> Result<(), HarnessError> {
        for (i, target) in self.targets.iter().enumerate() {
            target.validate()?;
            if self.targets[..i]
                .iter()
                .any(|t| t.id.eq_ignore_ascii_case(&target.id))
            {
                return Err(HarnessError::DuplicateTarget(target.id.clone()));
            }
            if let OutputFormat::FreeText { pattern } = &target.output {
                compile_pattern(&target.id, pattern)?;
            }
        }
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.targets
            .iter()
            .position(|t| t.id.eq_ignore_ascii_case(id))
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.position(id).map(|i| &self.targets[i])
    }

    /// Resolves a requested subset, in request order.
    ///
    /// An empty request selects every target. Repeated ids are collapsed to
    /// their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::UnknownTarget`] for an id that is not
    /// registered.
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<Target>, HarnessError> {
        if ids.is_empty() {
            return Ok(self.targets.clone());
        }
        let mut selected: Vec<Target> = Vec::with_capacity(ids.len());
        for id in ids {
            let target = self.get(id).ok_or_else(|| HarnessError::UnknownTarget {
                requested: id.clone(),
                known: self.ids().collect::<Vec<_>>().join(", "),
            })?;
            if !selected.iter().any(|t| t.id == target.id) {
                selected.push(target.clone());
            }
        }
        Ok(selected)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn buddy() -> Target {
    Target::new("BuDDy", "C", "{root}/BuDDy/examples/queen/queen {size}")
        .with_build_step(
            BuildStep::new("./configure")
                .in_dir("BuDDy")
                .creates("BuDDy/config.status")
                .chmod_exec("BuDDy/configure"),
        )
        .with_build_step(
            BuildStep::new("make")
                .in_dir("BuDDy")
                .creates("BuDDy/src/libbdd.la"),
        )
        .with_build_step(BuildStep::new("make -C examples/queen queen").in_dir("BuDDy"))
        .with_artifact("BuDDy/examples/queen/queen")
        .with_env(LD_PATH, "{root}/BuDDy/src/.libs:${LD_LIBRARY_PATH}")
}

fn sylvan() -> Target {
    let binary = "sylvan/build/examples/nqueens_fast";
    Target::new(
        "Sylvan",
        "C",
        "{root}/sylvan/build/examples/nqueens_fast -w {workers} {size}",
    )
    .with_build_step(
        BuildStep::new(
            "cmake -S sylvan -B sylvan/build -DSYLVAN_STATS=ON \
             -DBUILD_SHARED_LIBS=OFF -DCMAKE_BUILD_TYPE=Release",
        )
        .creates(binary),
    )
    .with_build_step(
        BuildStep::new("cmake --build sylvan/build --target nqueens_fast -j{jobs}").creates(binary),
    )
    .with_artifact(binary)
    .with_env(LD_PATH, "{root}/sylvan/build/src:${LD_LIBRARY_PATH}")
    .with_workers(WorkerSupport::AutoDetect)
}

fn cudd() -> Target {
    Target::new("CUDD", "C", "{root}/cudd/bin/nqueens_bdd {size}")
        .with_build_step(
            BuildStep::new("./configure")
                .in_dir("cudd")
                .creates("cudd/config.status")
                .chmod_exec("cudd/configure"),
        )
        .with_build_step(
            BuildStep::new(
                "make -j{jobs} ACLOCAL=true AUTOMAKE=true AUTOCONF=true AUTOHEADER=true",
            )
            .in_dir("cudd")
            .creates("cudd/cudd/.libs/libcudd.a"),
        )
        .with_build_step(
            BuildStep::new(
                "mkdir -p cudd/bin && gcc -O3 -I./cudd -I./cudd/cudd -I./cudd/mtr -I./cudd/st \
                 -I./cudd/util -I./cudd/epd -o cudd/bin/nqueens_bdd cudd/examples/nqueens_bdd.c \
                 cudd/cudd/.libs/libcudd.a -lm",
            )
            .creates("cudd/bin/nqueens_bdd"),
        )
        .with_artifact("cudd/bin/nqueens_bdd")
}

fn jdd() -> Target {
    Target::new(
        "JDD",
        "Java",
        "java -cp build/classes/java/main jdd.examples.BDDQueens {size}",
    )
    .with_workdir("jdd")
    .with_build_step(
        BuildStep::new("./gradlew --no-daemon classes")
            .in_dir("jdd")
            .creates("jdd/build/classes/java/main/jdd/examples/BDDQueens.class")
            .chmod_exec("jdd/gradlew"),
    )
    .with_artifact("jdd/build/classes/java/main/jdd/examples/BDDQueens.class")
}

fn jsylvan() -> Target {
    let script = "src/main/c/sylvan-java/build-sylvan.sh";
    Target::new(
        "JSylvan",
        "Java",
        "java -cp target/sylvan-1.0.0-SNAPSHOT.jar jsylvan.examples.JSylvanNQueens -w {workers} {size}",
    )
    .with_workdir("jsylvan")
    .with_build_step(
        BuildStep::new(
            "PKG_CONFIG=\"$(command -v pkg-config)\" PKG_CONFIG_EXECUTABLE=\"$(command -v pkg-config)\" \
             ./src/main/c/sylvan-java/build-sylvan.sh https://github.com/trolando/sylvan.git v1.4.1",
        )
        .in_dir("jsylvan")
        .creates("jsylvan/src/main/resources/linux-x64/libsylvan-java.so")
        .chmod_exec(format!("jsylvan/{script}")),
    )
    .with_build_step(
        BuildStep::new("mvn -q -DskipTests package")
            .in_dir("jsylvan")
            .creates("jsylvan/target/sylvan-1.0.0-SNAPSHOT.jar"),
    )
    .with_artifact("jsylvan/target/sylvan-1.0.0-SNAPSHOT.jar")
    .with_workers(WorkerSupport::AutoDetect)
}
