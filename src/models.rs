/// A backend model the user can pick. `id` is sent verbatim as `model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub name: &'static str,
    pub id: &'static str,
}

pub const MODELS: &[ModelOption] = &[
    ModelOption { name: "Sonar", id: "sonar" },
    ModelOption { name: "Sonar Reasoning", id: "sonar-reasoning" },
    ModelOption { name: "Sonar Deep Research", id: "sonar-deep-research" },
    ModelOption { name: "Sonar Pro", id: "sonar-pro" },
    ModelOption { name: "R1", id: "r1-1776" },
];

pub fn ids() -> Vec<&'static str> {
    MODELS.iter().map(|m| m.id).collect()
}

pub fn find(id: &str) -> Option<usize> {
    MODELS.iter().position(|m| m.id == id)
}

/// Which model the next query goes to. Defaults to the first entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSelector {
    selected: usize,
}

impl ModelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &'static [ModelOption] {
        MODELS
    }

    pub fn selected(&self) -> ModelOption {
        MODELS[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn select_index(&mut self, index: usize) -> bool {
        if index < MODELS.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn select_id(&mut self, id: &str) -> bool {
        match find(id) {
            Some(i) => self.select_index(i),
            None => false,
        }
    }

    pub fn next(&mut self) {
        self.selected = (self.selected + 1) % MODELS.len();
    }

    pub fn prev(&mut self) {
        self.selected = (self.selected + MODELS.len() - 1) % MODELS.len();
    }
}
