use super::{Collector, FactoryRequest, Library, LibraryRegistry, Product};
use formix_types::{Domain, FormixError, GenericValue, Result};

pub fn register<D: Domain>(registry: &mut LibraryRegistry<D>) {
    registry.register("formix.constants", collector::<D>);
}

fn pi<D: Domain>(domain: &D, _: &FactoryRequest<'_>) -> Result<Product<D>> {
    Ok(Product::Value(GenericValue::discrete(domain.pi())))
}

/// Euler's number; approximated in exact domains
fn euler<D: Domain>(domain: &D, _: &FactoryRequest<'_>) -> Result<Product<D>> {
    Ok(Product::Value(GenericValue::discrete(domain.from_double(std::f64::consts::E)?)))
}

fn imaginary_unit<D: Domain>(domain: &D, request: &FactoryRequest<'_>) -> Result<Product<D>> {
    domain
        .imaginary_unit()
        .map(|i| Product::Value(GenericValue::discrete(i)))
        .ok_or_else(|| FormixError::unimplemented(request.symbol, domain.name()))
}

pub fn collector<D: Domain>() -> Box<dyn Library<D>> {
    Box::new(
        Collector::new("formix.constants")
            .with("pi", pi::<D>)
            .with("e", euler::<D>)
            .with("i", imaginary_unit::<D>),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use formix_types::{ComplexDomain, RealDomain};

    #[test]
    fn test_imaginary_unit_needs_complex_domain() {
        let request = FactoryRequest { symbol: "i", precedence: None };
        let real = collector::<RealDomain>().factory("i").unwrap();
        let err = real(&RealDomain::new(), &request).err().unwrap();
        assert_eq!(err.to_string(), "Unimplemented function: i in real domain");

        let complex = collector::<ComplexDomain>().factory("i").unwrap();
        assert!(complex(&ComplexDomain::new(), &request).is_ok());
    }
}
