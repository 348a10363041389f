fn main() -> anyhow::Result<()> {
    patient_vcf::cli::run()
}
