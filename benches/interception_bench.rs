// benches/interception_bench.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dynaproxy::generation::GenerationCache;
use dynaproxy::interception::{interceptor_fn, Interceptor, Invocation};
use dynaproxy::model::{MemberBuilder, Object, Target, TypeBuilder, TypeInfo, TypeRef, Value};
use dynaproxy::{GenerationOptions, ProxyGenerator, ProxyRequest};
use std::sync::Arc;

fn adder() -> (Arc<TypeInfo>, Arc<dyn Target>) {
    let iface = TypeBuilder::interface("IAdder")
        .member(
            MemberBuilder::method("Add")
                .param("a", TypeRef::Int)
                .param("b", TypeRef::Int)
                .returns(TypeRef::Int),
        )
        .build()
        .expect("interface builds");
    let class = TypeBuilder::class("Adder")
        .implements(&iface)
        .member(
            MemberBuilder::method("Add")
                .param("a", TypeRef::Int)
                .param("b", TypeRef::Int)
                .returns(TypeRef::Int)
                .body(|_, frame| Ok(Value::Int(frame.int(0)? + frame.int(1)?))),
        )
        .build()
        .expect("class builds");
    let target: Arc<dyn Target> = Object::new(&class, &[]).expect("target constructs");
    (iface, target)
}

fn pass_through() -> Arc<dyn Interceptor> {
    interceptor_fn(|invocation: &mut Invocation<'_>| invocation.proceed())
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let (iface, target) = adder();
    let generator = ProxyGenerator::default();
    let options = GenerationOptions::default();

    group.bench_function("direct", |b| {
        b.iter(|| target.call("Add", &mut [Value::Int(2), Value::Int(3)]))
    });

    for depth in [0usize, 1, 4] {
        let chain: Vec<_> = (0..depth).map(|_| pass_through()).collect();
        let proxy = generator
            .create_interface_proxy(&[iface.clone()], Some(target.clone()), &[], &options, &chain)
            .expect("proxy creates");

        group.bench_function(format!("proxy_chain_{depth}"), |b| {
            b.iter(|| proxy.invoke_index(0, &[], &mut [black_box(Value::Int(2)), Value::Int(3)]))
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    let (iface, _) = adder();
    let request = ProxyRequest::for_interfaces(&[iface]).with_target();

    let warm = ProxyGenerator::new(Arc::new(GenerationCache::new()));
    warm.generate(&request).expect("descriptor generates");
    group.bench_function("cache_hit", |b| b.iter(|| warm.generate(black_box(&request))));

    group.bench_function("cold_synthesis", |b| {
        b.iter(|| ProxyGenerator::default().generate(black_box(&request)))
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_generation);
criterion_main!(benches);
