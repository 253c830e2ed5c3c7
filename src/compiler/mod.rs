//! Pass compiler (C5, §4.5) — the heart of the system.
//!
//! Consumes the client's enqueued passes, evaluates their resource usage,
//! builds the dependency table, culls dead passes, reorders the survivors
//! for render-target reuse, and rebases their commands onto one global,
//! strictly increasing index space.

mod cull;
mod dependency;
mod reorder;

pub use cull::reachable_active_set;
pub use dependency::{build_dependency_table, DependencyEdge, DependencyTable};

use crate::arena::{Tag, TagArena};
use crate::pass::{CommandRecorder, EnqueuedPass, PassCallback, PassKind, PassRecord};
use crate::resource::ResourceHandle;
use crate::usage::UsageLog;

/// Output of one compile: the surviving, reordered passes; their reduced
/// dependency table; and every resource any of them touched.
pub struct CompiledGraph {
    pub active_passes: Vec<PassRecord>,
    pub dependency_table: DependencyTable,
    pub used_resources: Vec<ResourceHandle>,
}

/// Stateless entry point for §4.5's eight-step algorithm.
pub struct PassCompiler;

impl PassCompiler {
    /// Runs the full compile. `usage_log` receives the rebased, merged usage
    /// timeline for every surviving resource (§4.5 step 7); `arena` provides
    /// the scratch lifetimes the algorithm frees as it goes (§4.1).
    pub async fn compile(
        mut enqueued: Vec<EnqueuedPass>,
        usage_log: &mut UsageLog,
        arena: &TagArena,
    ) -> CompiledGraph {
        if enqueued.is_empty() {
            log::debug!("compiling empty frame graph");
            return CompiledGraph {
                active_passes: Vec::new(),
                dependency_table: DependencyTable::new(0),
                used_resources: Vec::new(),
            };
        }

        let recorders = Self::evaluate_usages(&mut enqueued, arena).await;

        // Lazy passes keep their callback around — it has not run yet and
        // only runs if the pass survives culling (§4.4 contract).
        let mut passes: Vec<PassRecord> = Vec::with_capacity(enqueued.len());
        let mut pending_callbacks: Vec<Option<PassCallback>> = Vec::with_capacity(enqueued.len());
        for p in enqueued {
            let is_eager = p.record.is_eager();
            passes.push(p.record);
            pending_callbacks.push(if is_eager { None } else { Some(p.callback) });
        }
        Self::compute_side_effects(&mut passes);

        let table = build_dependency_table(&passes);
        let active = reachable_active_set(&passes, &table);
        let order = reorder::schedule(&passes, &table, &active);

        let (active_passes, dependency_table, used_resources) =
            Self::finish(passes, recorders, pending_callbacks, &table, order, usage_log, arena);

        arena.free_tag(Tag::GraphCompilation);
        log::debug!(
            "compiled frame graph: {} enqueued, {} active, {} culled",
            active.len(),
            active_passes.len(),
            active.iter().filter(|a| !**a).count()
        );

        CompiledGraph {
            active_passes,
            dependency_table,
            used_resources,
        }
    }

    /// §4.5 step 1. Eager passes (empty declared writes) run their callback
    /// now — CPU passes serially on the calling task, GPU passes as
    /// concurrent worker tasks joined before this function returns. Lazy
    /// passes only have their declared read/write sets copied in; their
    /// callback runs later, in step 5, if they survive culling.
    async fn evaluate_usages(
        enqueued: &mut [EnqueuedPass],
        arena: &TagArena,
    ) -> Vec<Option<CommandRecorder>> {
        let mut recorders: Vec<Option<CommandRecorder>> = (0..enqueued.len()).map(|_| None).collect();
        let mut worker_tasks = Vec::new();

        for (i, pass) in enqueued.iter_mut().enumerate() {
            if !pass.record.is_eager() {
                continue;
            }
            if matches!(pass.record.kind, PassKind::Cpu) {
                let mut recorder = CommandRecorder::new(pass.record.index);
                (pass.callback)(&mut recorder);
                arena.free_tag(Tag::PassExecutionScratch(pass.record.index));
                recorders[i] = Some(recorder);
            } else {
                let index = pass.record.index;
                let mut callback = std::mem::replace(&mut pass.callback, Box::new(|_| {}));
                worker_tasks.push(tokio::spawn(async move {
                    let mut recorder = CommandRecorder::new(index);
                    callback(&mut recorder);
                    (i, recorder)
                }));
            }
        }

        for result in futures::future::join_all(worker_tasks).await {
            match result {
                Ok((i, recorder)) => recorders[i] = Some(recorder),
                Err(join_error) => panic!("pass callback task failed: {join_error}"),
            }
        }

        for (i, pass) in enqueued.iter_mut().enumerate() {
            if pass.record.is_eager() {
                let recorder = recorders[i].as_ref().expect("eager pass was evaluated above");
                pass.record.read_resources = recorder.read_resources().into();
                pass.record.written_resources = recorder.written_resources().into();
                pass.record.write_side_effects = pass
                    .record
                    .written_resources
                    .iter()
                    .map(|r| {
                        recorder
                            .side_effects()
                            .iter()
                            .find(|(flagged, _)| flagged == r)
                            .map_or_else(crate::pass::SideEffectFlags::default, |(_, flags)| *flags)
                    })
                    .collect();
                arena.free_tag(Tag::PassExecutionScratch(pass.record.index));
            } else {
                pass.record.read_resources = pass.record.declared_reads.clone();
                pass.record.written_resources = pass.record.declared_writes.clone();
                recorders[i] = Some(CommandRecorder::new(pass.record.index));
            }
        }

        recorders
    }

    /// A pass has side effects iff one of its writes targets a persistent
    /// resource or one flagged window-handle / history-buffer /
    /// external-ownership (§4.5 step 2). A pass that writes a window-handle
    /// resource additionally sets `uses_window_texture` for present
    /// coordination (§4.5 edge cases).
    fn compute_side_effects(passes: &mut [PassRecord]) {
        for pass in passes.iter_mut() {
            let persistent_write = pass.written_resources.iter().any(ResourceHandle::is_persistent);
            let flagged = pass.write_side_effects.iter().any(|f| f.any());
            pass.has_side_effects = persistent_write || flagged;
            pass.uses_window_texture = pass.write_side_effects.iter().any(|f| f.window_handle);
        }
    }

    /// Steps 5-7: execute surviving lazy passes, drop passes that produced
    /// zero commands, remap the dependency table to the new index space, and
    /// rebase every surviving pass's commands onto one global range.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        mut passes: Vec<PassRecord>,
        mut recorders: Vec<Option<CommandRecorder>>,
        mut pending_callbacks: Vec<Option<PassCallback>>,
        table: &DependencyTable,
        order: Vec<usize>,
        usage_log: &mut UsageLog,
        arena: &TagArena,
    ) -> (Vec<PassRecord>, DependencyTable, Vec<ResourceHandle>) {
        let mut surviving_old_index = Vec::with_capacity(order.len());
        let mut surviving_passes = Vec::with_capacity(order.len());
        let mut cursor: u32 = 0;
        let mut used_resources: Vec<ResourceHandle> = Vec::new();

        for old_index in order {
            if let Some(mut callback) = pending_callbacks[old_index].take() {
                // §4.5 step 5: a lazy pass that survived culling has not run
                // yet — record its commands now.
                let mut recorder = CommandRecorder::new(passes[old_index].index);
                callback(&mut recorder);
                arena.free_tag(Tag::PassExecutionScratch(passes[old_index].index));
                recorders[old_index] = Some(recorder);
            }

            let recorder = recorders[old_index].take().expect("every scheduled pass has a recorder");
            if recorder.is_empty() {
                // Lazy pass survived culling but its callback produced no
                // commands once actually run, or it is CPU-only — drop it.
                log::trace!("dropping pass {old_index}: zero commands recorded");
                continue;
            }
            if matches!(passes[old_index].kind, PassKind::Cpu) {
                continue;
            }

            let mut pass = std::mem::replace(&mut passes[old_index], PassRecord::new(0, PassKind::Cpu, ""));
            let len = recorder.command_count() as u32;
            let lo = cursor;
            cursor += len;
            pass.command_range = lo..lo + len;

            for resource in pass.read_resources.iter().chain(pass.written_resources.iter()) {
                if !used_resources.contains(resource) {
                    used_resources.push(*resource);
                }
            }

            for mut usage in recorder.into_usages().into_entries() {
                usage.command_range = (usage.command_range.start + lo)..(usage.command_range.end + lo);
                usage_log.merge_or_append(usage);
            }

            pass.is_active = true;
            surviving_old_index.push(old_index);
            surviving_passes.push(pass);
        }

        let new_index_of: std::collections::HashMap<usize, usize> = surviving_old_index
            .iter()
            .enumerate()
            .map(|(new_i, &old_i)| (old_i, new_i))
            .collect();

        let mut remapped = DependencyTable::new(surviving_passes.len());
        for (new_i, &old_i) in surviving_old_index.iter().enumerate() {
            for (old_dep, edge) in table.dependencies_of(old_i) {
                if let Some(&new_dep) = new_index_of.get(&old_dep) {
                    if new_dep < new_i {
                        remapped.set(new_i, new_dep, edge);
                    }
                }
            }
        }

        (surviving_passes, remapped, used_resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::{Command, SideEffectFlags};
    use crate::resource::{Lifetime, ResourceKind, SubresourceMask};
    use crate::usage::{AccessKind, RenderStages};

    fn transient(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Texture, Lifetime::Transient, 0, 0, index)
    }

    /// An eager draw pass writing a transient swapchain/window texture has no
    /// persistent write and nothing else reads it — by §4.5 step 2 it would
    /// be culled entirely unless the callback flags the write, which is
    /// exactly what `uses_window_texture` exists to prevent losing.
    #[tokio::test]
    async fn eager_pass_flagging_a_window_handle_write_survives_and_is_marked() {
        let window_texture = transient(0);
        let mut record = PassRecord::new(0, PassKind::Draw, "present");
        let callback: PassCallback = Box::new(move |recorder: &mut CommandRecorder| {
            recorder.flag_side_effects(window_texture, SideEffectFlags { window_handle: true, ..Default::default() });
            recorder.record(
                Command::Draw { vertices: 0..3, instances: 0..1 },
                window_texture,
                AccessKind::RENDER_TARGET_COLOR,
                RenderStages::FRAGMENT,
                SubresourceMask::full(),
            );
        });
        record.render_target = Some(crate::pass::RenderTargetDescriptor::new());

        let enqueued = vec![EnqueuedPass::new(record, callback)];
        let arena = TagArena::default();
        let mut usage_log = UsageLog::new();
        let compiled = PassCompiler::compile(enqueued, &mut usage_log, &arena).await;

        assert_eq!(compiled.active_passes.len(), 1);
        assert!(compiled.active_passes[0].uses_window_texture);
        assert!(compiled.active_passes[0].has_side_effects);
    }

    /// Same pass shape without the flag: nothing reads the transient texture
    /// and it is not persistent, so the pass has no side effects and is
    /// culled — confirms the flag in the test above is load-bearing, not
    /// incidental.
    #[tokio::test]
    async fn eager_pass_writing_an_unflagged_transient_texture_is_culled() {
        let scratch_texture = transient(0);
        let mut record = PassRecord::new(0, PassKind::Draw, "scratch");
        let callback: PassCallback = Box::new(move |recorder: &mut CommandRecorder| {
            recorder.record(
                Command::Draw { vertices: 0..3, instances: 0..1 },
                scratch_texture,
                AccessKind::RENDER_TARGET_COLOR,
                RenderStages::FRAGMENT,
                SubresourceMask::full(),
            );
        });
        record.render_target = Some(crate::pass::RenderTargetDescriptor::new());

        let enqueued = vec![EnqueuedPass::new(record, callback)];
        let arena = TagArena::default();
        let mut usage_log = UsageLog::new();
        let compiled = PassCompiler::compile(enqueued, &mut usage_log, &arena).await;

        assert!(compiled.active_passes.is_empty());
    }
}
