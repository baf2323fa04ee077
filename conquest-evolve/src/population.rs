//! Population management and the generational step

use std::collections::BTreeMap;
use std::sync::Arc;

use conquest_core::{Agent, AgentId, Gene, MatchError, Topology};
use conquest_tournament::{evaluate_population, EvaluationSummary};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::crossover::crossover;
use crate::mutation::mutate;
use crate::selection::select_parents;
use crate::EvolutionConfig;

/// Statistics recorded after evaluating one generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// 0-based generation index
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    /// Highest fitness measured in any generation so far
    pub champion_fitness: f64,
    pub best_gene: Option<Gene>,
    pub best_strategy: String,
    /// Agents per gene
    pub gene_histogram: BTreeMap<Gene, usize>,
    /// Rates used to breed the next generation
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub evaluation: EvaluationSummary,
}

/// An ordered set of agents (descending fitness after evaluation)
#[derive(Clone, Debug)]
pub struct Population {
    agents: Vec<Agent>,
    generation: usize,
    next_id: AgentId,
    best_ever: Option<Agent>,
}

impl Population {
    /// `size` agents with uniformly random genes
    pub fn random<R: Rng>(size: usize, hybrid: bool, rng: &mut R) -> Self {
        Self::from_genes((0..size).map(|_| Gene::random(rng, hybrid)).collect::<Vec<_>>())
    }

    /// Seed a population from explicit genes, ids in order
    pub fn from_genes(genes: impl IntoIterator<Item = Gene>) -> Self {
        let agents: Vec<Agent> = genes
            .into_iter()
            .enumerate()
            .map(|(i, gene)| Agent::new(i as AgentId, gene))
            .collect();
        let next_id = agents.len() as AgentId;
        Self {
            agents,
            generation: 0,
            next_id,
            best_ever: None,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Generations bred so far
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Top agent of the latest evaluation
    pub fn best(&self) -> Option<&Agent> {
        self.agents.first()
    }

    /// Highest-fitness agent seen in any evaluation
    pub fn best_ever(&self) -> Option<&Agent> {
        self.best_ever.as_ref()
    }

    pub fn gene_histogram(&self) -> BTreeMap<Gene, usize> {
        let mut histogram = BTreeMap::new();
        for agent in &self.agents {
            *histogram.entry(agent.gene).or_insert(0) += 1;
        }
        histogram
    }

    fn next_id(&mut self) -> AgentId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Evaluate and rank the current agents
    pub fn run_generation<R: Rng>(
        &mut self,
        topology: &Arc<Topology>,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<GenerationStats, MatchError> {
        let evaluation = evaluate_population(&mut self.agents, topology, &config.evaluation, rng)?;

        if let Some(top) = self.agents.first() {
            let improved = self
                .best_ever
                .as_ref()
                .map_or(true, |best| top.fitness > best.fitness);
            if improved {
                self.best_ever = Some(top.clone());
            }
        }

        let best = self.best();
        Ok(GenerationStats {
            generation: self.generation,
            best_fitness: evaluation.best_fitness,
            mean_fitness: evaluation.mean_fitness,
            champion_fitness: self.best_ever.as_ref().map_or(0.0, |a| a.fitness),
            best_gene: best.map(|a| a.gene),
            best_strategy: best.map(|a| a.strategy_name()).unwrap_or_default(),
            gene_histogram: self.gene_histogram(),
            mutation_rate: config.mutation_rate_at(self.generation),
            crossover_rate: config.crossover_rate_at(self.generation),
            evaluation,
        })
    }

    /// Breed the next generation from the ranked agents.
    ///
    /// Elites are copied forward with fresh ids; the remaining slots are
    /// filled with children of two distinct pool parents, after crossover
    /// and mutation at the current (decayed) rates.
    pub fn next_generation<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        let size = self.agents.len();
        if size == 0 {
            return;
        }

        let mutation_rate = config.mutation_rate_at(self.generation);
        let crossover_rate = config.crossover_rate_at(self.generation);
        let pool = select_parents(&self.agents, config.elitism, config.pool_size(), rng);

        let elite_genes: Vec<Gene> = self
            .agents
            .iter()
            .take(config.elitism.min(size))
            .map(|a| a.gene)
            .collect();

        let mut next = Vec::with_capacity(size);
        for gene in elite_genes {
            let id = self.next_id();
            next.push(Agent::new(id, gene));
        }

        while next.len() < size {
            let (a, b) = pick_parents(&pool, rng);
            let (g1, g2) = crossover(&self.agents[a].gene, &self.agents[b].gene, crossover_rate, rng);
            let g1 = mutate(&g1, mutation_rate, rng);
            let g2 = mutate(&g2, mutation_rate, rng);

            for gene in [g1, g2] {
                if next.len() < size {
                    let id = self.next_id();
                    next.push(Agent::new(id, gene));
                }
            }
        }

        self.agents = next;
        self.generation += 1;
        tracing::trace!(generation = self.generation, "bred next generation");
    }
}

/// Two distinct pool members (the same one twice if the pool has one)
fn pick_parents<R: Rng>(pool: &[usize], rng: &mut R) -> (usize, usize) {
    if pool.len() < 2 {
        let only = pool.first().copied().unwrap_or(0);
        return (only, only);
    }
    let picked = index::sample(rng, pool.len(), 2);
    (pool[picked.index(0)], pool[picked.index(1)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::{MatchConfig, Strategy};
    use conquest_tournament::EvalConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 12,
            generations: 4,
            elitism: 2,
            evaluation: EvalConfig::new(6)
                .with_players(4)
                .with_match_config(MatchConfig::default().with_max_rounds(20)),
            ..Default::default()
        }
    }

    fn topology() -> Arc<Topology> {
        Arc::new(Topology::standard().unwrap())
    }

    #[test]
    fn test_random_population() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pop = Population::random(40, false, &mut rng);
        assert_eq!(pop.len(), 40);
        assert!(pop.agents().iter().all(|a| a.gene.width() == 3));
        let ids: Vec<AgentId> = pop.agents().iter().map(|a| a.id).collect();
        assert_eq!(ids, (0..40).collect::<Vec<_>>());

        let hybrid = Population::random(10, true, &mut rng);
        assert!(hybrid.agents().iter().all(|a| a.gene.is_hybrid()));
    }

    #[test]
    fn test_gene_histogram() {
        let genes = [Strategy::Pacifist, Strategy::Fortress, Strategy::Fortress]
            .into_iter()
            .map(Gene::simple);
        let pop = Population::from_genes(genes);
        let histogram = pop.gene_histogram();
        assert_eq!(histogram[&Gene::simple(Strategy::Fortress)], 2);
        assert_eq!(histogram[&Gene::simple(Strategy::Pacifist)], 1);
    }

    #[test]
    fn test_run_generation_ranks_and_records() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = small_config();
        let mut pop = Population::random(config.population_size, false, &mut rng);

        let stats = pop.run_generation(&topology(), &config, &mut rng).unwrap();

        assert_eq!(stats.generation, 0);
        assert!(pop.agents().windows(2).all(|w| w[0].fitness >= w[1].fitness));
        assert_eq!(stats.best_fitness, pop.best().unwrap().fitness);
        assert_eq!(stats.champion_fitness, stats.best_fitness);
        assert_eq!(stats.gene_histogram.values().sum::<usize>(), 12);
        assert!((stats.mutation_rate - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_next_generation_keeps_elite_and_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = small_config();
        let mut pop = Population::random(config.population_size, false, &mut rng);
        pop.run_generation(&topology(), &config, &mut rng).unwrap();

        let elite: Vec<Gene> = pop.agents()[..2].iter().map(|a| a.gene).collect();
        let old_ids: Vec<AgentId> = pop.agents().iter().map(|a| a.id).collect();

        pop.next_generation(&config, &mut rng);

        assert_eq!(pop.len(), 12);
        assert_eq!(pop.generation(), 1);
        let carried: Vec<Gene> = pop.agents()[..2].iter().map(|a| a.gene).collect();
        assert_eq!(carried, elite);
        // Fresh ids and reset statistics for everyone
        assert!(pop.agents().iter().all(|a| !old_ids.contains(&a.id)));
        assert!(pop.agents().iter().all(|a| a.fitness == 0.0 && a.stats.matches_played == 0));
    }

    #[test]
    fn test_next_generation_preserves_gene_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = EvolutionConfig {
            hybrid_genes: true,
            ..small_config()
        };
        let mut pop = Population::random(config.population_size, true, &mut rng);
        pop.run_generation(&topology(), &config, &mut rng).unwrap();
        pop.next_generation(&config, &mut rng);
        assert!(pop.agents().iter().all(|a| a.gene.is_hybrid()));
    }

    #[test]
    fn test_pick_parents_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pool = vec![4, 9, 2];
        for _ in 0..50 {
            let (a, b) = pick_parents(&pool, &mut rng);
            assert_ne!(a, b);
            assert!(pool.contains(&a) && pool.contains(&b));
        }
        assert_eq!(pick_parents(&[5], &mut rng), (5, 5));
    }
}
